//! Connection contract between the provider and libvirt
//!
//! The resource code only talks to libvirt through [`Connection`] and
//! [`StoragePool`]. The connection is handed to every entry point inside a
//! [`Client`]; it is never opened or closed by the resources themselves.

use std::ops::Deref;

use thiserror::Error;
use tracing::{error, warn};

use libvirt_pool_common::{Error, Result};

use crate::config::ProviderConfig;

// Flag values from libvirt-storage.h (virStoragePoolBuildFlags and
// virStoragePoolCreateFlags), so the mock build can use them without virt.

/// `VIR_STORAGE_POOL_BUILD_NO_OVERWRITE`: refuse to format over existing data.
pub const BUILD_NO_OVERWRITE: u32 = 1 << 2;

/// `VIR_STORAGE_POOL_CREATE_NORMAL`: start the pool without building it.
pub const CREATE_NORMAL: u32 = 0;

/// Coarse classification of a libvirt error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtErrorCode {
    /// `VIR_ERR_NO_STORAGE_POOL`
    NoStoragePool,
    /// `VIR_ERR_OPERATION_INVALID`
    OperationInvalid,
    /// Anything else
    Other,
}

/// Error reported by the virtualization layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct VirtError {
    pub code: VirtErrorCode,
    pub message: String,
}

impl VirtError {
    pub fn new(code: VirtErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_storage_pool(message: impl Into<String>) -> Self {
        Self::new(VirtErrorCode::NoStoragePool, message)
    }

    /// Whether the lookup failed because no such pool exists.
    pub fn is_not_found(&self) -> bool {
        self.code == VirtErrorCode::NoStoragePool
    }
}

pub type VirtResult<T> = std::result::Result<T, VirtError>;

/// Per-pool operations on a handle obtained from a [`Connection`].
pub trait StoragePool {
    fn name(&self) -> VirtResult<String>;

    fn uuid_string(&self) -> VirtResult<String>;

    fn autostart(&self) -> VirtResult<bool>;

    fn set_autostart(&self, autostart: bool) -> VirtResult<()>;

    fn build(&self, flags: u32) -> VirtResult<()>;

    /// Start (activate) the pool.
    fn create(&self, flags: u32) -> VirtResult<()>;

    /// Stop the pool. The definition is kept.
    fn destroy(&self) -> VirtResult<()>;

    fn undefine(&self) -> VirtResult<()>;

    fn is_active(&self) -> VirtResult<bool>;

    /// Release the native handle. Must be safe to call once per handle.
    fn free(&mut self) -> VirtResult<()>;
}

/// Connection-level storage pool operations.
pub trait Connection {
    type Pool: StoragePool;

    fn lookup_pool_by_name(&self, name: &str) -> VirtResult<Self::Pool>;

    fn lookup_pool_by_uuid_string(&self, uuid: &str) -> VirtResult<Self::Pool>;

    fn define_pool_xml(&self, xml: &str, flags: u32) -> VirtResult<Self::Pool>;
}

/// Owns a pool handle and frees it when dropped, on every exit path.
pub struct PoolGuard<P: StoragePool> {
    pool: P,
}

impl<P: StoragePool> PoolGuard<P> {
    pub fn new(pool: P) -> Self {
        Self { pool }
    }
}

impl<P: StoragePool> Deref for PoolGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.pool
    }
}

impl<P: StoragePool> Drop for PoolGuard<P> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.free() {
            warn!(error = %e, "Failed to free storage pool handle");
        }
    }
}

/// Client context passed to every resource entry point.
pub struct Client<C> {
    libvirt: Option<C>,
}

impl<C: Connection> Client<C> {
    pub fn new(connection: C) -> Self {
        Self {
            libvirt: Some(connection),
        }
    }

    /// A client whose connection was never established.
    pub fn disconnected() -> Self {
        Self { libvirt: None }
    }

    /// The libvirt connection, or `ConnectionUnavailable` when absent.
    pub fn connection(&self) -> Result<&C> {
        self.libvirt.as_ref().ok_or(Error::ConnectionUnavailable)
    }

    pub fn is_connected(&self) -> bool {
        self.libvirt.is_some()
    }
}

#[cfg(feature = "libvirt")]
pub type DefaultConnection = crate::libvirt::LibvirtConnection;

#[cfg(not(feature = "libvirt"))]
pub type DefaultConnection = crate::mock::MockConnection;

/// Open the connection described by `config`.
///
/// Failures are logged and yield a disconnected client, so each lifecycle
/// call reports `ConnectionUnavailable`.
pub fn connect(config: &ProviderConfig) -> Client<DefaultConnection> {
    #[cfg(feature = "libvirt")]
    {
        match crate::libvirt::LibvirtConnection::open(&config.uri) {
            Ok(connection) => Client::new(connection),
            Err(e) => {
                error!(uri = %config.uri, error = %e, "Failed to connect to libvirt");
                Client::disconnected()
            }
        }
    }

    #[cfg(not(feature = "libvirt"))]
    {
        error!(
            uri = %config.uri,
            "libvirt support is not compiled in; rebuild with the `libvirt` feature"
        );
        Client::disconnected()
    }
}
