//! libvirt pool provider common library
//!
//! Shared types, errors and the pool XML model.

pub mod error;
pub mod types;
pub mod xml;

pub use error::{Error, Result};
pub use types::*;
pub use xml::PoolDefinition;

/// Provider version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
