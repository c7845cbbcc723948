//! Schema of the `libvirt_pool` resource

use serde::Serialize;

use crate::state::{bool_value, string_value, DynamicValue};

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Bool,
}

/// Default applied when the configuration leaves an attribute unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeDefault {
    String(&'static str),
    Bool(bool),
}

impl AttributeDefault {
    fn value(&self) -> DynamicValue {
        match self {
            AttributeDefault::String(s) => string_value(*s),
            AttributeDefault::Bool(b) => bool_value(*b),
        }
    }
}

/// One attribute of the resource. Nested block attributes use dotted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub required: bool,
    pub computed: bool,
    /// Changing the value requires destroying and recreating the pool.
    pub force_new: bool,
    pub default: Option<AttributeDefault>,
    pub description: &'static str,
}

const fn attribute(
    name: &'static str,
    kind: AttributeType,
    description: &'static str,
) -> Attribute {
    Attribute {
        name,
        kind,
        required: false,
        computed: false,
        force_new: false,
        default: None,
        description,
    }
}

/// Resource type name
pub const POOL_TYPE_NAME: &str = "libvirt_pool";

/// Attributes of the `libvirt_pool` resource.
pub const POOL_ATTRIBUTES: &[Attribute] = &[
    Attribute {
        required: true,
        force_new: true,
        ..attribute("name", AttributeType::String, "Name of the storage pool")
    },
    Attribute {
        force_new: true,
        default: Some(AttributeDefault::String("dir")),
        ..attribute("type", AttributeType::String, "Storage pool type")
    },
    Attribute {
        required: true,
        force_new: true,
        ..attribute("target.path", AttributeType::String, "Target path of the pool on the host")
    },
    Attribute {
        computed: true,
        ..attribute("uuid", AttributeType::String, "UUID assigned by libvirt")
    },
    Attribute {
        default: Some(AttributeDefault::Bool(false)),
        ..attribute("autostart", AttributeType::Bool, "Start the pool when libvirtd starts")
    },
    Attribute {
        default: Some(AttributeDefault::Bool(false)),
        ..attribute("start", AttributeType::Bool, "Start the pool after defining it")
    },
    Attribute {
        default: Some(AttributeDefault::Bool(false)),
        ..attribute(
            "build",
            AttributeType::Bool,
            "Build the pool after defining it, without overwriting",
        )
    },
    Attribute {
        force_new: true,
        ..attribute(
            "source_device.path",
            AttributeType::String,
            "Source device, required for fs pools",
        )
    },
];

/// Fill unset attributes that have a default.
pub fn apply_defaults(config: &DynamicValue) -> DynamicValue {
    let mut config = config.clone();
    for attr in POOL_ATTRIBUTES {
        let Some(default) = attr.default else {
            continue;
        };
        let unset = match config.get(attr.name) {
            None | Some(DynamicValue::Null) => true,
            Some(DynamicValue::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if unset {
            config.set(attr.name, default.value());
        }
    }
    config
}

/// Attributes whose change can only be applied by replacing the pool.
///
/// Update applies `autostart` in place and leaves every other attribute
/// alone, so a caller must recreate the pool for anything listed here.
pub fn requires_replace(prior: &DynamicValue, planned: &DynamicValue) -> Vec<&'static str> {
    let prior = apply_defaults(prior);
    let planned = apply_defaults(planned);

    POOL_ATTRIBUTES
        .iter()
        .filter(|attr| attr.force_new)
        .filter(|attr| normalized(prior.get(attr.name)) != normalized(planned.get(attr.name)))
        .map(|attr| attr.name)
        .collect()
}

/// Treat missing, null and empty-string values alike.
fn normalized(value: Option<&DynamicValue>) -> Option<&DynamicValue> {
    match value {
        None | Some(DynamicValue::Null) => None,
        Some(DynamicValue::String(s)) if s.is_empty() => None,
        other => other,
    }
}
