//! Storage pool commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use libvirt_pool_provider::schema::{self, Attribute, AttributeDefault, POOL_ATTRIBUTES};
use libvirt_pool_provider::state::{
    decode_dynamic_value, encode_dynamic_value, get_bool_attr, get_string_attr,
};
use libvirt_pool_provider::{connect, DynamicValue, PoolResource, ProviderConfig, Resource};

use crate::output::{
    print_item, print_list, print_success, print_warning, OutputFormat, TableDisplay,
};

#[derive(Subcommand)]
pub enum PoolCommands {
    /// Define a pool from a JSON configuration
    Create {
        /// Resource configuration (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Write the resulting state here
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Refresh a pool's state from libvirt
    Read {
        /// Resource state (JSON), rewritten in place
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Apply in-place changes (autostart) to an existing pool
    Update {
        /// Resource state (JSON), rewritten in place
        #[arg(short, long)]
        state: PathBuf,

        /// New resource configuration (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Stop and undefine a pool
    Delete {
        /// Resource state (JSON)
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Check whether the pool named in a configuration exists
    Exists {
        /// Resource configuration or state (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show which changes apply in place and which need a new pool
    Plan {
        /// Current resource state (JSON)
        #[arg(short, long)]
        state: PathBuf,

        /// New resource configuration (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the resource schema
    Schema,
}

/// Pool state display wrapper
#[derive(Serialize)]
pub struct PoolDisplay {
    pub id: String,
    pub name: String,
    pub uuid: String,
    #[serde(rename = "type")]
    pub pool_type: String,
    pub target_path: String,
    pub autostart: bool,
}

impl From<&DynamicValue> for PoolDisplay {
    fn from(state: &DynamicValue) -> Self {
        Self {
            id: get_string_attr(state, "id"),
            name: get_string_attr(state, "name"),
            uuid: get_string_attr(state, "uuid"),
            pool_type: get_string_attr(state, "type"),
            target_path: get_string_attr(state, "target.path"),
            autostart: get_bool_attr(state, "autostart", false),
        }
    }
}

impl TableDisplay for PoolDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "UUID", "Type", "Target", "Autostart"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.uuid.clone(),
            self.pool_type.clone(),
            self.target_path.clone(),
            self.autostart.to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct ExistsDisplay {
    pub name: String,
    pub exists: bool,
}

impl TableDisplay for ExistsDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Exists"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.exists.to_string()]
    }
}

#[derive(Serialize)]
pub struct PlanDisplay {
    pub update_in_place: Vec<String>,
    pub requires_replace: Vec<String>,
}

impl TableDisplay for PlanDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Update in place", "Requires replace"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.update_in_place.join(", "), self.requires_replace.join(", ")]
    }
}

#[derive(Serialize)]
pub struct AttributeDisplay(Attribute);

impl TableDisplay for AttributeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Attribute", "Type", "Required", "Computed", "Force new", "Default", "Description"]
    }

    fn row(&self) -> Vec<String> {
        let attr = &self.0;
        let default = match attr.default {
            Some(AttributeDefault::String(s)) => format!("\"{}\"", s),
            Some(AttributeDefault::Bool(b)) => b.to_string(),
            None => String::new(),
        };
        vec![
            attr.name.to_string(),
            format!("{:?}", attr.kind).to_lowercase(),
            attr.required.to_string(),
            attr.computed.to_string(),
            attr.force_new.to_string(),
            default,
            attr.description.to_string(),
        ]
    }
}

pub fn execute(cmd: PoolCommands, config: &ProviderConfig, format: OutputFormat) -> Result<()> {
    match cmd {
        PoolCommands::Create { file, state } => {
            let client = connect(config);
            let new_state = PoolResource::create(&client, &read_value(&file)?)?;
            if let Some(path) = state {
                write_state(&path, &new_state)?;
            }
            let display = PoolDisplay::from(&new_state);
            print_success(&format!("Pool '{}' created", display.name));
            print_item(&display, format);
        }

        PoolCommands::Read { state } => {
            let client = connect(config);
            let new_state = PoolResource::read(&client, &read_value(&state)?)?;
            write_state(&state, &new_state)?;
            print_item(&PoolDisplay::from(&new_state), format);
        }

        PoolCommands::Update { state, file } => {
            let client = connect(config);
            let prior = read_value(&state)?;
            let planned = read_value(&file)?;

            let replace = schema::requires_replace(&prior, &planned);
            if !replace.is_empty() {
                print_warning(&format!(
                    "Kept at their current values, recreate the pool to change: {}",
                    replace.join(", ")
                ));
            }

            let new_state = PoolResource::update(&client, &prior, &planned)?;
            write_state(&state, &new_state)?;
            let display = PoolDisplay::from(&new_state);
            print_success(&format!("Pool '{}' updated", display.name));
            print_item(&display, format);
        }

        PoolCommands::Delete { state } => {
            let client = connect(config);
            let prior = read_value(&state)?;
            PoolResource::delete(&client, &prior)?;
            print_success(&format!("Pool '{}' deleted", get_string_attr(&prior, "name")));
        }

        PoolCommands::Exists { file } => {
            let client = connect(config);
            let value = read_value(&file)?;
            let exists = PoolResource::exists(&client, &value)?;
            print_item(
                &ExistsDisplay {
                    name: get_string_attr(&value, "name"),
                    exists,
                },
                format,
            );
        }

        PoolCommands::Plan { state, file } => {
            let plan = plan(&read_value(&state)?, &read_value(&file)?);
            print_item(&plan, format);
        }

        PoolCommands::Schema => {
            let attrs: Vec<AttributeDisplay> =
                POOL_ATTRIBUTES.iter().copied().map(AttributeDisplay).collect();
            print_list(&attrs, format);
        }
    }

    Ok(())
}

/// Compare state with a new configuration without contacting libvirt.
fn plan(prior: &DynamicValue, planned: &DynamicValue) -> PlanDisplay {
    let prior = schema::apply_defaults(prior);
    let planned = schema::apply_defaults(planned);

    let mut update_in_place = Vec::new();
    if get_bool_attr(&prior, "autostart", false) != get_bool_attr(&planned, "autostart", false) {
        update_in_place.push("autostart".to_string());
    }

    PlanDisplay {
        update_in_place,
        requires_replace: schema::requires_replace(&prior, &planned)
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

fn read_value(path: &Path) -> Result<DynamicValue> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = decode_dynamic_value(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(value)
}

fn write_state(path: &Path, state: &DynamicValue) -> Result<()> {
    let data = encode_dynamic_value(state)?;
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
