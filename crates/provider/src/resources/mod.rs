//! Resource Implementations
//!
//! Implements the lifecycle operations for each resource type.

pub mod pool;

use libvirt_pool_common::Result;
use crate::client::{Client, Connection};
use crate::state::DynamicValue;

/// Trait for resource operations
///
/// Every operation receives the client context explicitly and checks for a
/// connection before doing anything else.
pub trait Resource {
    /// Resource type name
    fn type_name() -> &'static str;

    /// Create a new resource, returning its state
    fn create<C: Connection>(client: &Client<C>, config: &DynamicValue) -> Result<DynamicValue>;

    /// Read an existing resource, refreshing the computed attributes of `state`
    fn read<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<DynamicValue>;

    /// Update an existing resource in place
    fn update<C: Connection>(
        client: &Client<C>,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue>;

    /// Delete a resource
    fn delete<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<()>;

    /// Check whether the resource still exists
    fn exists<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<bool>;
}
