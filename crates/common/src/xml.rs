//! Libvirt storage pool XML.
//!
//! Only the subset of the `<pool>` schema the provider populates is modelled.
//! Documents are written, never parsed back; libvirt is queried through
//! accessor calls instead.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// `<pool type="...">` root element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "pool")]
pub struct PoolDefinition {
    #[serde(rename = "@type")]
    pub pool_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PoolSource>,
    pub target: PoolTarget,
}

/// `<source>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSource {
    #[serde(rename = "device")]
    pub devices: Vec<PoolSourceDevice>,
}

/// `<device path="..."/>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSourceDevice {
    #[serde(rename = "@path")]
    pub path: String,
}

/// `<target>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolTarget {
    pub path: String,
}

impl PoolDefinition {
    /// Serialize to the XML accepted by `virStoragePoolDefineXML`.
    pub fn to_xml(&self) -> Result<String> {
        let xml = quick_xml::se::to_string(self)
            .map_err(|e| Error::Definition(format!("failed to serialize pool XML: {}", e)))?;
        debug!(xml = %xml, "Generated pool XML");
        Ok(xml)
    }
}
