//! In-memory libvirt connection for testing and development.
//!
//! [`MockConnection`] keeps storage pools in a shared map, records every
//! outbound call in order and can be told to fail a given operation. It also
//! counts handles handed out and freed so tests can check that nothing leaks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::client::{Connection, StoragePool, VirtError, VirtErrorCode, VirtResult};

/// One outbound call, in the order it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    LookupByName(String),
    LookupByUuid(String),
    DefineXml(String),
    GetName,
    GetUuidString,
    GetAutostart,
    SetAutostart(bool),
    Build(u32),
    Create(u32),
    Destroy,
    Undefine,
    IsActive,
    Free,
}

impl MockCall {
    /// Libvirt-style operation name, used as the key for failure injection.
    pub fn op(&self) -> &'static str {
        match self {
            MockCall::LookupByName(_) => "LookupStoragePoolByName",
            MockCall::LookupByUuid(_) => "LookupStoragePoolByUUIDString",
            MockCall::DefineXml(_) => "StoragePoolDefineXML",
            MockCall::GetName => "GetName",
            MockCall::GetUuidString => "GetUUIDString",
            MockCall::GetAutostart => "GetAutostart",
            MockCall::SetAutostart(_) => "SetAutostart",
            MockCall::Build(_) => "Build",
            MockCall::Create(_) => "Create",
            MockCall::Destroy => "Destroy",
            MockCall::Undefine => "Undefine",
            MockCall::IsActive => "IsActive",
            MockCall::Free => "Free",
        }
    }
}

/// Snapshot of a pool held by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPoolInfo {
    pub name: String,
    pub uuid: String,
    pub xml: String,
    pub active: bool,
    pub autostart: bool,
    pub built: bool,
}

#[derive(Default)]
struct MockState {
    pools: HashMap<String, MockPoolInfo>,
    calls: Vec<MockCall>,
    failures: HashMap<&'static str, VirtError>,
    handles_acquired: usize,
    handles_released: usize,
}

impl MockState {
    /// Record `call` and return the injected failure for it, if any.
    fn record(&mut self, call: MockCall) -> VirtResult<()> {
        let op = call.op();
        debug!(call = ?call, "mock libvirt call");
        self.calls.push(call);
        match self.failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Mock libvirt connection.
///
/// Clones share the same pools and call log.
#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pool as if it had been defined out of band.
    pub fn insert_pool(&self, name: &str, active: bool, autostart: bool) -> String {
        let uuid = Uuid::new_v4().to_string();
        self.state.lock().pools.insert(
            name.to_string(),
            MockPoolInfo {
                name: name.to_string(),
                uuid: uuid.clone(),
                xml: String::new(),
                active,
                autostart,
                built: false,
            },
        );
        uuid
    }

    /// Make every subsequent call to `op` fail with `err`.
    pub fn fail_on(&self, op: &'static str, err: VirtError) {
        self.state.lock().failures.insert(op, err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn pool(&self, name: &str) -> Option<MockPoolInfo> {
        self.state.lock().pools.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Calls other than handle bookkeeping (`Free`).
    pub fn remote_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| *call != MockCall::Free)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Handles returned by lookups or defines that were not freed yet.
    pub fn outstanding_handles(&self) -> usize {
        let state = self.state.lock();
        state.handles_acquired - state.handles_released
    }

    fn handle(&self, state: &mut MockState, name: String) -> MockPool {
        state.handles_acquired += 1;
        MockPool {
            state: Arc::clone(&self.state),
            name,
            freed: false,
        }
    }
}

impl Connection for MockConnection {
    type Pool = MockPool;

    fn lookup_pool_by_name(&self, name: &str) -> VirtResult<MockPool> {
        let mut state = self.state.lock();
        state.record(MockCall::LookupByName(name.to_string()))?;
        if !state.pools.contains_key(name) {
            return Err(VirtError::no_storage_pool(format!(
                "Storage pool not found: no storage pool with matching name '{}'",
                name
            )));
        }
        Ok(self.handle(&mut state, name.to_string()))
    }

    fn lookup_pool_by_uuid_string(&self, uuid: &str) -> VirtResult<MockPool> {
        let mut state = self.state.lock();
        state.record(MockCall::LookupByUuid(uuid.to_string()))?;
        let name = state
            .pools
            .values()
            .find(|pool| pool.uuid == uuid)
            .map(|pool| pool.name.clone())
            .ok_or_else(|| {
                VirtError::no_storage_pool(format!(
                    "Storage pool not found: no storage pool with matching uuid '{}'",
                    uuid
                ))
            })?;
        Ok(self.handle(&mut state, name))
    }

    fn define_pool_xml(&self, xml: &str, _flags: u32) -> VirtResult<MockPool> {
        let mut state = self.state.lock();
        state.record(MockCall::DefineXml(xml.to_string()))?;

        let name = defined_pool_name(xml)?;

        // Redefining an existing name keeps its UUID, as libvirt does.
        let pool = state
            .pools
            .entry(name.clone())
            .or_insert_with(|| MockPoolInfo {
                name: name.clone(),
                uuid: Uuid::new_v4().to_string(),
                xml: String::new(),
                active: false,
                autostart: false,
                built: false,
            });
        pool.xml = xml.to_string();

        Ok(self.handle(&mut state, name))
    }
}

/// Handle to a pool inside a [`MockConnection`].
pub struct MockPool {
    state: Arc<Mutex<MockState>>,
    name: String,
    freed: bool,
}

impl MockPool {
    fn with_pool<T>(
        &self,
        call: MockCall,
        f: impl FnOnce(&mut MockPoolInfo) -> VirtResult<T>,
    ) -> VirtResult<T> {
        let mut state = self.state.lock();
        state.record(call)?;
        let pool = state.pools.get_mut(&self.name).ok_or_else(|| {
            VirtError::no_storage_pool(format!("Storage pool not found: {}", self.name))
        })?;
        f(pool)
    }
}

impl StoragePool for MockPool {
    fn name(&self) -> VirtResult<String> {
        self.with_pool(MockCall::GetName, |pool| Ok(pool.name.clone()))
    }

    fn uuid_string(&self) -> VirtResult<String> {
        self.with_pool(MockCall::GetUuidString, |pool| Ok(pool.uuid.clone()))
    }

    fn autostart(&self) -> VirtResult<bool> {
        self.with_pool(MockCall::GetAutostart, |pool| Ok(pool.autostart))
    }

    fn set_autostart(&self, autostart: bool) -> VirtResult<()> {
        self.with_pool(MockCall::SetAutostart(autostart), |pool| {
            pool.autostart = autostart;
            Ok(())
        })
    }

    fn build(&self, flags: u32) -> VirtResult<()> {
        self.with_pool(MockCall::Build(flags), |pool| {
            pool.built = true;
            Ok(())
        })
    }

    fn create(&self, flags: u32) -> VirtResult<()> {
        self.with_pool(MockCall::Create(flags), |pool| {
            if pool.active {
                return Err(VirtError::new(
                    VirtErrorCode::OperationInvalid,
                    "Requested operation is not valid: storage pool is already active",
                ));
            }
            pool.active = true;
            Ok(())
        })
    }

    fn destroy(&self) -> VirtResult<()> {
        self.with_pool(MockCall::Destroy, |pool| {
            if !pool.active {
                return Err(VirtError::new(
                    VirtErrorCode::OperationInvalid,
                    "Requested operation is not valid: storage pool is not active",
                ));
            }
            pool.active = false;
            Ok(())
        })
    }

    fn undefine(&self) -> VirtResult<()> {
        let mut state = self.state.lock();
        state.record(MockCall::Undefine)?;
        match state.pools.get(&self.name) {
            Some(pool) if pool.active => Err(VirtError::new(
                VirtErrorCode::OperationInvalid,
                "Requested operation is not valid: storage pool is still active",
            )),
            Some(_) => {
                state.pools.remove(&self.name);
                Ok(())
            }
            None => Err(VirtError::no_storage_pool(format!(
                "Storage pool not found: {}",
                self.name
            ))),
        }
    }

    fn is_active(&self) -> VirtResult<bool> {
        self.with_pool(MockCall::IsActive, |pool| Ok(pool.active))
    }

    fn free(&mut self) -> VirtResult<()> {
        if self.freed {
            return Ok(());
        }
        let mut state = self.state.lock();
        state.record(MockCall::Free)?;
        state.handles_released += 1;
        self.freed = true;
        Ok(())
    }
}

/// The part of a `<pool>` document the mock keys pools by.
#[derive(Deserialize)]
struct DefinedPool {
    name: String,
}

fn defined_pool_name(xml: &str) -> VirtResult<String> {
    quick_xml::de::from_str::<DefinedPool>(xml)
        .map(|pool| pool.name)
        .map_err(|e| VirtError::new(VirtErrorCode::Other, format!("XML error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_assigns_uuid_and_keeps_it_on_redefine() {
        let conn = MockConnection::new();
        let mut pool = conn
            .define_pool_xml("<pool type=\"dir\"><name>p</name></pool>", 0)
            .unwrap();
        let uuid = pool.uuid_string().unwrap();
        assert!(!uuid.is_empty());
        pool.free().unwrap();

        let mut again = conn
            .define_pool_xml("<pool type=\"dir\"><name>p</name></pool>", 0)
            .unwrap();
        assert_eq!(again.uuid_string().unwrap(), uuid);
        again.free().unwrap();
        assert_eq!(conn.outstanding_handles(), 0);
    }

    #[test]
    fn test_lookup_missing_pool_is_not_found() {
        let conn = MockConnection::new();
        let err = conn.lookup_pool_by_name("missing").err().unwrap();
        assert!(err.is_not_found());
        let err = conn.lookup_pool_by_uuid_string("missing").err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_injected_failure() {
        let conn = MockConnection::new();
        conn.insert_pool("p", true, false);
        conn.fail_on("Destroy", VirtError::new(VirtErrorCode::Other, "busy"));

        let mut pool = conn.lookup_pool_by_name("p").unwrap();
        assert_eq!(pool.destroy().unwrap_err().message, "busy");
        assert!(conn.pool("p").unwrap().active);
        pool.free().unwrap();

        assert_eq!(
            conn.calls(),
            vec![
                MockCall::LookupByName("p".into()),
                MockCall::Destroy,
                MockCall::Free,
            ]
        );
    }

    #[test]
    fn test_free_is_idempotent() {
        let conn = MockConnection::new();
        conn.insert_pool("p", false, false);
        let mut pool = conn.lookup_pool_by_name("p").unwrap();
        pool.free().unwrap();
        pool.free().unwrap();
        assert_eq!(conn.outstanding_handles(), 0);
        assert_eq!(conn.calls().iter().filter(|c| **c == MockCall::Free).count(), 1);
    }

    #[test]
    fn test_defined_pool_name() {
        let xml = r#"<pool type="dir"><name>x</name><target><path>/x</path></target></pool>"#;
        assert_eq!(defined_pool_name(xml).unwrap(), "x");
        assert_eq!(defined_pool_name("<pool><name>a&amp;b</name></pool>").unwrap(), "a&b");
        assert!(defined_pool_name("<pool/>").is_err());
    }
}
