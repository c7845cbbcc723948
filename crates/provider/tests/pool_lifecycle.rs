//! Lifecycle behaviour of the `libvirt_pool` resource against the in-memory
//! libvirt connection.

use libvirt_pool_common::{Error, PoolCreateSpec, PoolType, PoolUpdateSpec};
use libvirt_pool_provider::client::{BUILD_NO_OVERWRITE, CREATE_NORMAL};
use libvirt_pool_provider::mock::MockCall;
use libvirt_pool_provider::state::{decode_dynamic_value, get_bool_attr, get_string_attr};
use libvirt_pool_provider::{
    Client, DynamicValue, MockConnection, PoolResource, Resource, VirtError, VirtErrorCode,
};
use test_case::test_case;

fn connected() -> (MockConnection, Client<MockConnection>) {
    let conn = MockConnection::new();
    (conn.clone(), Client::new(conn))
}

fn config(json: &str) -> DynamicValue {
    decode_dynamic_value(json.as_bytes()).expect("valid config json")
}

#[test]
fn create_dir_pool_with_autostart_and_start() {
    let (conn, client) = connected();

    let state = PoolResource::create(
        &client,
        &config(r#"{"name": "pool1", "type": "dir", "target": {"path": "/data/pool1"}, "autostart": true, "start": true}"#),
    )
    .unwrap();

    assert_eq!(get_string_attr(&state, "id"), "pool1");
    assert_eq!(get_string_attr(&state, "name"), "pool1");
    assert!(!get_string_attr(&state, "uuid").is_empty());
    assert!(get_bool_attr(&state, "autostart", false));

    let calls = conn.remote_calls();
    match &calls[0] {
        MockCall::DefineXml(xml) => {
            assert!(xml.contains(r#"type="dir""#));
            assert!(xml.contains("<name>pool1</name>"));
            assert!(xml.contains("<path>/data/pool1</path>"));
        }
        other => panic!("expected define first, got {:?}", other),
    }
    assert!(calls.contains(&MockCall::SetAutostart(true)));
    assert!(calls.contains(&MockCall::Create(CREATE_NORMAL)));
    assert!(!calls.iter().any(|c| matches!(c, MockCall::Build(_))));

    let pool = conn.pool("pool1").unwrap();
    assert!(pool.active);
    assert!(pool.autostart);
    assert_eq!(get_string_attr(&state, "uuid"), pool.uuid);
    assert_eq!(conn.outstanding_handles(), 0);
}

#[test]
fn create_fs_pool_without_source_device_makes_no_remote_call() {
    let (conn, client) = connected();

    let err = PoolResource::create(
        &client,
        &config(r#"{"name": "pool2", "type": "fs", "target": {"path": "/mnt/p2"}}"#),
    )
    .unwrap_err();

    assert!(matches!(err, Error::InvalidConfig(_)), "{}", err);
    assert!(conn.calls().is_empty());
    assert!(conn.pool("pool2").is_none());
}

#[test]
fn create_fs_pool_with_source_device_and_build() {
    let (conn, client) = connected();

    let spec = PoolCreateSpec::new("pool2", "/mnt/p2")
        .with_type(PoolType::Fs)
        .with_source_device("/dev/sdb1")
        .with_build(true);
    PoolResource::create_pool(&client, &spec).unwrap();

    let pool = conn.pool("pool2").unwrap();
    assert!(pool.xml.contains(r#"path="/dev/sdb1""#));
    assert!(pool.built);
    assert!(conn.calls().contains(&MockCall::Build(BUILD_NO_OVERWRITE)));
}

#[test_case("dir")]
#[test_case("netfs")]
#[test_case("logical")]
#[test_case("disk")]
fn non_fs_pools_do_not_need_source_device(pool_type: &str) {
    let (conn, client) = connected();
    let json = format!(
        r#"{{"name": "p", "type": "{}", "target": {{"path": "/p"}}}}"#,
        pool_type
    );

    PoolResource::create(&client, &config(&json)).unwrap();
    assert!(conn.pool("p").is_some());
}

#[test]
fn create_then_read_agree() {
    let (_conn, client) = connected();

    let created = PoolResource::create(
        &client,
        &config(r#"{"name": "pool1", "target": {"path": "/data/pool1"}, "autostart": true}"#),
    )
    .unwrap();
    let read = PoolResource::read(&client, &created).unwrap();

    assert_eq!(get_string_attr(&read, "uuid"), get_string_attr(&created, "uuid"));
    assert_eq!(
        get_bool_attr(&read, "autostart", false),
        get_bool_attr(&created, "autostart", true)
    );
    assert_eq!(get_string_attr(&read, "target.path"), "/data/pool1");
}

#[test]
fn create_then_read_name_with_markup_characters() {
    let (conn, client) = connected();

    let identity =
        PoolResource::create_pool(&client, &PoolCreateSpec::new("a&b<c>", "/data/ab")).unwrap();
    assert_eq!(identity.name, "a&b<c>");
    assert!(conn.pool("a&b<c>").is_some());

    let info = PoolResource::read_pool(&client, "a&b<c>").unwrap();
    assert_eq!(info.name, identity.name);
    assert_eq!(info.uuid, identity.uuid);
}

#[test]
fn read_refreshes_drifted_autostart() {
    let (conn, client) = connected();
    let uuid = conn.insert_pool("pool1", false, true);

    let state = config(r#"{"id": "pool1", "name": "pool1", "autostart": false}"#);
    let read = PoolResource::read(&client, &state).unwrap();

    assert_eq!(get_string_attr(&read, "uuid"), uuid);
    assert!(get_bool_attr(&read, "autostart", false));
}

#[test]
fn read_missing_pool_is_not_found() {
    let (_conn, client) = connected();
    let err = PoolResource::read(&client, &config(r#"{"id": "gone"}"#)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn exists_distinguishes_absent_from_failure() {
    let (conn, client) = connected();
    let state = config(r#"{"name": "pool1"}"#);

    assert!(!PoolResource::exists(&client, &state).unwrap());

    conn.insert_pool("pool1", false, false);
    assert!(PoolResource::exists(&client, &state).unwrap());
    assert_eq!(conn.outstanding_handles(), 0);

    conn.fail_on(
        "LookupStoragePoolByName",
        VirtError::new(VirtErrorCode::Other, "cannot recv data: connection reset"),
    );
    let err = PoolResource::exists(&client, &state).unwrap_err();
    assert!(
        matches!(err, Error::Lookup { ref message, .. } if message.contains("connection reset")),
        "{}",
        err
    );
}

#[test]
fn update_without_autostart_change_is_silent() {
    let (conn, client) = connected();
    conn.insert_pool("pool1", false, true);

    let prior = PoolUpdateSpec { autostart: true };
    PoolResource::update_pool(&client, "pool1", &prior, &prior).unwrap();
    assert!(conn.calls().is_empty());

    // Changes to create-only attributes are not applied in place.
    let state = config(r#"{"id": "pool1", "name": "pool1", "target": {"path": "/a"}, "autostart": true}"#);
    let planned = config(r#"{"name": "pool1", "target": {"path": "/b"}, "autostart": true}"#);
    let new_state = PoolResource::update(&client, &state, &planned).unwrap();
    assert!(conn.calls().is_empty());
    assert_eq!(get_string_attr(&new_state, "target.path"), "/b");
}

#[test]
fn update_autostart_issues_single_call() {
    let (conn, client) = connected();
    let uuid = conn.insert_pool("pool1", true, false);

    let state = config(&format!(
        r#"{{"id": "pool1", "name": "pool1", "uuid": "{}", "autostart": false}}"#,
        uuid
    ));
    let planned = config(r#"{"name": "pool1", "autostart": true}"#);
    let new_state = PoolResource::update(&client, &state, &planned).unwrap();

    let set_calls: Vec<_> = conn
        .calls()
        .into_iter()
        .filter(|c| matches!(c, MockCall::SetAutostart(_)))
        .collect();
    assert_eq!(set_calls, vec![MockCall::SetAutostart(true)]);
    assert!(conn.pool("pool1").unwrap().autostart);
    assert_eq!(get_string_attr(&new_state, "uuid"), uuid);
    assert_eq!(conn.outstanding_handles(), 0);
}

#[test]
fn delete_active_pool_destroys_then_undefines() {
    let (conn, client) = connected();
    let uuid = conn.insert_pool("pool1", true, false);

    let state = config(&format!(r#"{{"id": "pool1", "uuid": "{}"}}"#, uuid));
    PoolResource::delete(&client, &state).unwrap();

    assert_eq!(
        conn.remote_calls(),
        vec![
            MockCall::LookupByUuid(uuid),
            MockCall::IsActive,
            MockCall::Destroy,
            MockCall::Undefine,
        ]
    );
    assert!(conn.pool("pool1").is_none());
    assert_eq!(conn.outstanding_handles(), 0);
}

#[test]
fn delete_inactive_pool_only_undefines() {
    let (conn, client) = connected();
    let uuid = conn.insert_pool("pool1", false, false);

    PoolResource::delete_pool(&client, &uuid).unwrap();

    assert_eq!(
        conn.remote_calls(),
        vec![MockCall::LookupByUuid(uuid), MockCall::IsActive, MockCall::Undefine]
    );
    assert!(conn.pool("pool1").is_none());
}

#[test]
fn delete_stops_when_destroy_fails() {
    let (conn, client) = connected();
    let uuid = conn.insert_pool("pool1", true, false);
    conn.fail_on("Destroy", VirtError::new(VirtErrorCode::Other, "device busy"));

    let err = PoolResource::delete_pool(&client, &uuid).unwrap_err();

    assert!(matches!(err, Error::Destroy(_)));
    assert!(!conn.calls().contains(&MockCall::Undefine));
    assert!(conn.pool("pool1").is_some());
    assert_eq!(conn.outstanding_handles(), 0);
}

#[test]
fn every_entry_point_requires_a_connection() {
    let client: Client<MockConnection> = Client::disconnected();
    let state = config(r#"{"id": "pool1", "name": "pool1", "uuid": "u", "target": {"path": "/p"}}"#);
    let fs_config = config(r#"{"name": "pool2", "type": "fs", "target": {"path": "/mnt/p2"}}"#);

    assert!(matches!(PoolResource::create(&client, &fs_config), Err(Error::ConnectionUnavailable)));
    assert!(matches!(PoolResource::read(&client, &state), Err(Error::ConnectionUnavailable)));
    assert!(matches!(
        PoolResource::update(&client, &state, &state),
        Err(Error::ConnectionUnavailable)
    ));
    assert!(matches!(PoolResource::delete(&client, &state), Err(Error::ConnectionUnavailable)));
    assert!(matches!(PoolResource::exists(&client, &state), Err(Error::ConnectionUnavailable)));
}

#[test]
fn full_lifecycle() {
    let (conn, client) = connected();
    assert_eq!(PoolResource::type_name(), "libvirt_pool");

    let created = PoolResource::create(
        &client,
        &config(r#"{"name": "pool1", "target": {"path": "/data/pool1"}, "start": true}"#),
    )
    .unwrap();
    assert!(PoolResource::exists(&client, &created).unwrap());

    let updated = PoolResource::update(
        &client,
        &created,
        &config(r#"{"name": "pool1", "target": {"path": "/data/pool1"}, "autostart": true}"#),
    )
    .unwrap();
    let read = PoolResource::read(&client, &updated).unwrap();
    assert!(get_bool_attr(&read, "autostart", false));

    PoolResource::delete(&client, &read).unwrap();
    assert!(!PoolResource::exists(&client, &read).unwrap());
    assert_eq!(conn.outstanding_handles(), 0);
}
