//! libvirt storage pool provider
//!
//! Terraform-style lifecycle operations (create, read, update, delete and an
//! existence check) for libvirt storage pools.
//!
//! ```rust,ignore
//! use libvirt_pool_common::PoolCreateSpec;
//! use libvirt_pool_provider::{Client, MockConnection, PoolResource};
//!
//! let client = Client::new(MockConnection::new());
//! let spec = PoolCreateSpec::new("pool1", "/data/pool1").with_start(true);
//! let identity = PoolResource::create_pool(&client, &spec)?;
//! ```

pub mod client;
pub mod config;
pub mod mock;
pub mod resources;
pub mod schema;
pub mod state;

#[cfg(feature = "libvirt")]
pub mod libvirt;

pub use client::{
    connect, Client, Connection, DefaultConnection, PoolGuard, StoragePool, VirtError,
    VirtErrorCode,
};
pub use config::ProviderConfig;
pub use mock::MockConnection;
pub use resources::{pool::PoolResource, Resource};
pub use state::DynamicValue;

#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtConnection;

/// Check if the libvirt connection is compiled in.
pub fn libvirt_available() -> bool {
    cfg!(feature = "libvirt")
}
