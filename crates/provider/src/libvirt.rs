//! Libvirt connection backed by the `virt` bindings.
//!
//! Requires the `libvirt` feature and a system libvirt installation.

use tracing::info;
use virt::connect::Connect;
use virt::error::ErrorNumber;
use virt::storage_pool::StoragePool as VirtStoragePool;

use crate::client::{Connection, StoragePool, VirtError, VirtErrorCode, VirtResult};

impl From<virt::error::Error> for VirtError {
    fn from(e: virt::error::Error) -> Self {
        let code = match e.code() {
            ErrorNumber::NoStoragePool => VirtErrorCode::NoStoragePool,
            ErrorNumber::OperationInvalid => VirtErrorCode::OperationInvalid,
            _ => VirtErrorCode::Other,
        };
        VirtError::new(code, e.to_string())
    }
}

/// Connection to a libvirt daemon.
pub struct LibvirtConnection {
    uri: String,
    connection: Connect,
}

impl LibvirtConnection {
    /// Connect to the given URI.
    ///
    /// Common URIs:
    /// - `qemu:///system` - System-wide QEMU/KVM
    /// - `qemu:///session` - User session QEMU
    /// - `qemu+ssh://user@host/system` - Remote via SSH
    pub fn open(uri: &str) -> VirtResult<Self> {
        info!(uri = %uri, "Connecting to libvirt");

        let connection = Connect::open(Some(uri))?;

        info!("Connected to libvirt");

        Ok(Self {
            uri: uri.to_string(),
            connection,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Connection for LibvirtConnection {
    type Pool = LibvirtPool;

    fn lookup_pool_by_name(&self, name: &str) -> VirtResult<LibvirtPool> {
        let pool = VirtStoragePool::lookup_by_name(&self.connection, name)?;
        Ok(LibvirtPool(pool))
    }

    fn lookup_pool_by_uuid_string(&self, uuid: &str) -> VirtResult<LibvirtPool> {
        let pool = VirtStoragePool::lookup_by_uuid_string(&self.connection, uuid)?;
        Ok(LibvirtPool(pool))
    }

    fn define_pool_xml(&self, xml: &str, flags: u32) -> VirtResult<LibvirtPool> {
        let pool = VirtStoragePool::define_xml(&self.connection, xml, flags)?;
        Ok(LibvirtPool(pool))
    }
}

/// Native storage pool handle.
pub struct LibvirtPool(VirtStoragePool);

impl StoragePool for LibvirtPool {
    fn name(&self) -> VirtResult<String> {
        Ok(self.0.get_name()?)
    }

    fn uuid_string(&self) -> VirtResult<String> {
        Ok(self.0.get_uuid_string()?)
    }

    fn autostart(&self) -> VirtResult<bool> {
        Ok(self.0.get_autostart()?)
    }

    fn set_autostart(&self, autostart: bool) -> VirtResult<()> {
        self.0.set_autostart(autostart)?;
        Ok(())
    }

    fn build(&self, flags: u32) -> VirtResult<()> {
        self.0.build(flags)?;
        Ok(())
    }

    fn create(&self, flags: u32) -> VirtResult<()> {
        self.0.create(flags)?;
        Ok(())
    }

    fn destroy(&self) -> VirtResult<()> {
        Ok(self.0.destroy()?)
    }

    fn undefine(&self) -> VirtResult<()> {
        Ok(self.0.undefine()?)
    }

    fn is_active(&self) -> VirtResult<bool> {
        Ok(self.0.is_active()?)
    }

    fn free(&mut self) -> VirtResult<()> {
        Ok(self.0.free()?)
    }
}
