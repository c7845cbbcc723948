//! Storage pool resource
//!
//! Maps a `libvirt_pool` configuration onto libvirt's pool definition XML and
//! the define/build/start/destroy/undefine calls. Every operation looks up
//! its own handle and frees it before returning; nothing is cached between
//! calls.
//!
//! Pools are found by name everywhere except [`PoolResource::delete_pool`],
//! which goes by the UUID recorded at creation.

use tracing::{debug, info, instrument};

use libvirt_pool_common::{
    Error, PoolCreateSpec, PoolIdentity, PoolInfo, PoolType, PoolUpdateSpec, Result,
};

use super::Resource;
use crate::client::{
    Client, Connection, PoolGuard, StoragePool, BUILD_NO_OVERWRITE, CREATE_NORMAL,
};
use crate::schema::{self, POOL_ATTRIBUTES, POOL_TYPE_NAME};
use crate::state::{
    bool_value, get_bool_attr, get_optional_string_attr, get_string_attr, make_state,
    string_value, DynamicValue,
};

pub struct PoolResource;

impl PoolResource {
    /// Define a pool and apply its one-shot triggers.
    ///
    /// The pool stays defined when autostart, build or start fail afterwards;
    /// the error is returned as is.
    #[instrument(skip(client, spec), fields(pool = %spec.name, pool_type = %spec.pool_type))]
    pub fn create_pool<C: Connection>(
        client: &Client<C>,
        spec: &PoolCreateSpec,
    ) -> Result<PoolIdentity> {
        let conn = client.connection()?;
        spec.validate()?;

        let xml = spec.definition().to_xml()?;

        info!("Defining storage pool");
        let pool = conn
            .define_pool_xml(&xml, 0)
            .map(PoolGuard::new)
            .map_err(|e| Error::Definition(e.to_string()))?;

        let name = pool
            .name()
            .map_err(|e| Error::Definition(format!("while fetching name: {}", e)))?;
        let uuid = pool
            .uuid_string()
            .map_err(|e| Error::Definition(format!("while fetching uuid: {}", e)))?;
        info!(uuid = %uuid, "Storage pool defined");

        if spec.autostart {
            pool.set_autostart(true)
                .map_err(|e| Error::Autostart(e.to_string()))?;
        }

        if spec.build {
            debug!("Building storage pool");
            pool.build(BUILD_NO_OVERWRITE)
                .map_err(|e| Error::Build(e.to_string()))?;
        }

        if spec.start {
            debug!("Starting storage pool");
            pool.create(CREATE_NORMAL)
                .map_err(|e| Error::Start(e.to_string()))?;
        }

        Ok(PoolIdentity { name, uuid })
    }

    /// Observe the UUID and autostart flag of the pool called `name`.
    #[instrument(skip(client))]
    pub fn read_pool<C: Connection>(client: &Client<C>, name: &str) -> Result<PoolInfo> {
        let conn = client.connection()?;
        let pool = lookup_by_name(conn, name)?;

        let uuid = pool.uuid_string().map_err(|e| Error::lookup("uuid", e))?;
        let autostart = pool.autostart().map_err(|e| Error::lookup("autostart", e))?;
        debug!(uuid = %uuid, autostart, "Read storage pool");

        Ok(PoolInfo {
            name: name.to_string(),
            uuid,
            autostart,
        })
    }

    /// Apply the in-place changes between `prior` and `planned`.
    ///
    /// Nothing is sent to libvirt when autostart is unchanged.
    #[instrument(skip(client))]
    pub fn update_pool<C: Connection>(
        client: &Client<C>,
        name: &str,
        prior: &PoolUpdateSpec,
        planned: &PoolUpdateSpec,
    ) -> Result<()> {
        let conn = client.connection()?;

        if prior.autostart == planned.autostart {
            debug!("No in-place changes");
            return Ok(());
        }

        let pool = lookup_by_name(conn, name)?;
        info!(autostart = planned.autostart, "Changing storage pool autostart");
        pool.set_autostart(planned.autostart)
            .map_err(|e| Error::Autostart(e.to_string()))
    }

    /// Stop the pool if it is running, then remove its definition.
    ///
    /// Undefine is not attempted when destroy fails. An empty `uuid` is looked
    /// up like any other and fails there.
    #[instrument(skip(client))]
    pub fn delete_pool<C: Connection>(client: &Client<C>, uuid: &str) -> Result<()> {
        let conn = client.connection()?;

        let pool = conn
            .lookup_pool_by_uuid_string(uuid)
            .map(PoolGuard::new)
            .map_err(|e| {
                if e.is_not_found() {
                    Error::NotFound(uuid.to_string())
                } else {
                    Error::lookup("by uuid", e)
                }
            })?;

        let active = pool.is_active().map_err(|e| Error::lookup("active state", e))?;
        if active {
            info!("Destroying active storage pool");
            pool.destroy().map_err(|e| Error::Destroy(e.to_string()))?;
        }

        info!("Undefining storage pool");
        pool.undefine().map_err(|e| Error::Undefine(e.to_string()))
    }

    /// Whether a pool called `name` exists. Only "no such pool" counts as
    /// absent; every other lookup failure is returned.
    #[instrument(skip(client))]
    pub fn pool_exists<C: Connection>(client: &Client<C>, name: &str) -> Result<bool> {
        let conn = client.connection()?;

        match conn.lookup_pool_by_name(name) {
            Ok(pool) => {
                drop(PoolGuard::new(pool));
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(Error::lookup("by name", e)),
        }
    }
}

impl Resource for PoolResource {
    fn type_name() -> &'static str {
        POOL_TYPE_NAME
    }

    fn create<C: Connection>(client: &Client<C>, config: &DynamicValue) -> Result<DynamicValue> {
        client.connection()?;
        let spec = spec_from_config(config)?;
        let identity = Self::create_pool(client, &spec)?;
        Ok(pool_to_state(&spec, &identity))
    }

    fn read<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<DynamicValue> {
        let name = resource_id(state);
        let info = Self::read_pool(client, &name)?;

        let mut new_state = state.clone();
        new_state.set("id", string_value(&info.name));
        new_state.set("name", string_value(&info.name));
        new_state.set("uuid", string_value(&info.uuid));
        new_state.set("autostart", bool_value(info.autostart));
        Ok(new_state)
    }

    fn update<C: Connection>(
        client: &Client<C>,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let name = resource_id(state);
        let planned = schema::apply_defaults(config);

        let prior_spec = update_spec(state);
        let planned_spec = update_spec(&planned);
        Self::update_pool(client, &name, &prior_spec, &planned_spec)?;

        let mut new_state = planned;
        keep_create_only_attrs(&mut new_state, &schema::apply_defaults(state));
        new_state.set("id", string_value(&name));
        new_state.set("name", string_value(&name));
        new_state.set("uuid", string_value(get_string_attr(state, "uuid")));
        Ok(new_state)
    }

    fn delete<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<()> {
        Self::delete_pool(client, &get_string_attr(state, "uuid"))
    }

    fn exists<C: Connection>(client: &Client<C>, state: &DynamicValue) -> Result<bool> {
        let name = get_optional_string_attr(state, "name").unwrap_or_else(|| resource_id(state));
        Self::pool_exists(client, &name)
    }
}

fn lookup_by_name<C: Connection>(conn: &C, name: &str) -> Result<PoolGuard<C::Pool>> {
    conn.lookup_pool_by_name(name)
        .map(PoolGuard::new)
        .map_err(|e| {
            if e.is_not_found() {
                Error::NotFound(name.to_string())
            } else {
                Error::lookup("by name", e)
            }
        })
}

/// Copy the force-new attributes of `prior` over `new_state`. Update never
/// applies them, so the state keeps what the pool was created with.
fn keep_create_only_attrs(new_state: &mut DynamicValue, prior: &DynamicValue) {
    for attr in POOL_ATTRIBUTES.iter().filter(|attr| attr.force_new) {
        let key = attr.name.split('.').next().unwrap_or(attr.name);
        new_state.set(key, prior.get(key).cloned().unwrap_or_default());
    }
}

/// The resource id is the pool name; fall back to `name` for state that
/// predates the id.
fn resource_id(state: &DynamicValue) -> String {
    get_optional_string_attr(state, "id").unwrap_or_else(|| get_string_attr(state, "name"))
}

/// Build the create spec from a resource configuration.
pub fn spec_from_config(config: &DynamicValue) -> Result<PoolCreateSpec> {
    let config = schema::apply_defaults(config);
    let pool_type: PoolType = get_string_attr(&config, "type").parse()?;

    Ok(PoolCreateSpec {
        name: get_string_attr(&config, "name"),
        pool_type,
        target_path: get_string_attr(&config, "target.path"),
        source_device_path: get_optional_string_attr(&config, "source_device.path"),
        autostart: get_bool_attr(&config, "autostart", false),
        start: get_bool_attr(&config, "start", false),
        build: get_bool_attr(&config, "build", false),
    })
}

fn update_spec(value: &DynamicValue) -> PoolUpdateSpec {
    PoolUpdateSpec {
        autostart: get_bool_attr(value, "autostart", false),
    }
}

fn pool_to_state(spec: &PoolCreateSpec, identity: &PoolIdentity) -> DynamicValue {
    let source_device = spec
        .source_device()
        .map(|path| make_state(vec![("path", string_value(path))]))
        .unwrap_or_default();

    make_state(vec![
        ("id", string_value(&identity.name)),
        ("name", string_value(&identity.name)),
        ("uuid", string_value(&identity.uuid)),
        ("type", string_value(spec.pool_type.as_str())),
        ("target", make_state(vec![("path", string_value(&spec.target_path))])),
        ("source_device", source_device),
        ("autostart", bool_value(spec.autostart)),
        ("start", bool_value(spec.start)),
        ("build", bool_value(spec.build)),
    ])
}
