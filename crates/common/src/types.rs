//! Core types for libvirt storage pools

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::xml::{PoolDefinition, PoolSource, PoolSourceDevice, PoolTarget};

/// Pool type used when the configuration does not name one.
pub const DEFAULT_POOL_TYPE: PoolType = PoolType::Dir;

/// Storage pool backend type, as understood by libvirt's `<pool type=...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    /// Plain directory on the host
    #[default]
    Dir,
    /// Pre-formatted block device mounted by libvirt
    Fs,
    /// Network exported directory
    Netfs,
    /// LVM volume group
    Logical,
    /// Physical disk device
    Disk,
    /// iSCSI target
    Iscsi,
    /// iSCSI target accessed directly by QEMU
    #[serde(rename = "iscsi-direct")]
    IscsiDirect,
    /// SCSI host adapter
    Scsi,
    /// Multipath devices
    Mpath,
    /// Ceph RBD
    Rbd,
    /// Sheepdog cluster
    Sheepdog,
    /// GlusterFS volume
    Gluster,
    /// ZFS pool
    Zfs,
    /// Virtuozzo storage
    Vstorage,
}

impl PoolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolType::Dir => "dir",
            PoolType::Fs => "fs",
            PoolType::Netfs => "netfs",
            PoolType::Logical => "logical",
            PoolType::Disk => "disk",
            PoolType::Iscsi => "iscsi",
            PoolType::IscsiDirect => "iscsi-direct",
            PoolType::Scsi => "scsi",
            PoolType::Mpath => "mpath",
            PoolType::Rbd => "rbd",
            PoolType::Sheepdog => "sheepdog",
            PoolType::Gluster => "gluster",
            PoolType::Zfs => "zfs",
            PoolType::Vstorage => "vstorage",
        }
    }

    /// Whether the definition must carry a `<source><device path=.../></source>`.
    pub fn requires_source_device(&self) -> bool {
        matches!(self, PoolType::Fs)
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let pool_type = match s {
            "dir" => PoolType::Dir,
            "fs" => PoolType::Fs,
            "netfs" => PoolType::Netfs,
            "logical" => PoolType::Logical,
            "disk" => PoolType::Disk,
            "iscsi" => PoolType::Iscsi,
            "iscsi-direct" => PoolType::IscsiDirect,
            "scsi" => PoolType::Scsi,
            "mpath" => PoolType::Mpath,
            "rbd" => PoolType::Rbd,
            "sheepdog" => PoolType::Sheepdog,
            "gluster" => PoolType::Gluster,
            "zfs" => PoolType::Zfs,
            "vstorage" => PoolType::Vstorage,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unsupported storage pool type: {}",
                    other
                )))
            }
        };
        Ok(pool_type)
    }
}

/// Everything needed to define a pool.
///
/// All fields are fixed once the pool exists. `start` and `build` are
/// one-shot triggers consumed at creation; `autostart` is the initial value
/// of the only attribute that [`PoolUpdateSpec`] can change later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCreateSpec {
    pub name: String,
    #[serde(default)]
    pub pool_type: PoolType,
    pub target_path: String,
    #[serde(default)]
    pub source_device_path: Option<String>,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub build: bool,
}

impl PoolCreateSpec {
    /// Create a `dir` pool spec with every trigger disabled.
    pub fn new(name: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pool_type: DEFAULT_POOL_TYPE,
            target_path: target_path.into(),
            source_device_path: None,
            autostart: false,
            start: false,
            build: false,
        }
    }

    pub fn with_type(mut self, pool_type: PoolType) -> Self {
        self.pool_type = pool_type;
        self
    }

    pub fn with_source_device(mut self, path: impl Into<String>) -> Self {
        self.source_device_path = Some(path.into());
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_start(mut self, start: bool) -> Self {
        self.start = start;
        self
    }

    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    /// Source device path, treating an empty string as unset.
    pub fn source_device(&self) -> Option<&str> {
        self.source_device_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }

    /// Check the spec without touching libvirt.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidConfig("name is required".to_string()));
        }
        if self.target_path.is_empty() {
            return Err(Error::InvalidConfig("target.path is required".to_string()));
        }
        if self.pool_type.requires_source_device() && self.source_device().is_none() {
            return Err(Error::InvalidConfig(format!(
                "source_device.path is required for pools of type {}",
                self.pool_type
            )));
        }
        Ok(())
    }

    /// Build the `<pool>` document for this spec.
    ///
    /// Only `fs` pools embed the source device; it is ignored for other types.
    pub fn definition(&self) -> PoolDefinition {
        let source = if self.pool_type.requires_source_device() {
            self.source_device().map(|path| PoolSource {
                devices: vec![PoolSourceDevice {
                    path: path.to_string(),
                }],
            })
        } else {
            None
        };

        PoolDefinition {
            pool_type: self.pool_type.as_str().to_string(),
            name: self.name.clone(),
            source,
            target: PoolTarget {
                path: self.target_path.clone(),
            },
        }
    }
}

/// The attributes of an existing pool that may change in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolUpdateSpec {
    pub autostart: bool,
}

/// Identity assigned by libvirt when the pool is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIdentity {
    /// Pool name, also used as the resource id
    pub name: String,
    /// UUID assigned at definition time
    pub uuid: String,
}

/// What a read observes on a live pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub name: String,
    pub uuid: String,
    pub autostart: bool,
}
