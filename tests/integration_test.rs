//! Integration tests for provision-console
//!
//! These tests drive the complete workflow against an in-memory server:
//! login, refresh, add, edit, save and remove.

use provision_console::api::{spawn_login, MockRoute};
use provision_console::models::derive_range;
use provision_console::{
    Completion, Console, ConsoleError, Credential, EntityKind, MockSource, RecordState, RemoteError,
};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::net::Ipv4Addr;
use std::time::Duration;

const BASIC_ADMIN: &str = "Basic YWRtaW46c2VjcmV0";

fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        _ => panic!("not an object"),
    }
}

fn server() -> MockSource {
    let mock = MockSource::new();
    mock.respond(
        Method::GET,
        "/bootenvs",
        json!([
            {"Name": "sledgehammer", "Available": true},
            {"Name": "local", "Available": true},
            {"Name": "centos-7", "Available": false}
        ]),
    );
    mock.respond(Method::GET, "/users/admin/token?ttl=28800", json!({"Token": "tok-1"}));
    mock.respond(
        Method::GET,
        "/interfaces",
        json!([{"Name": "eth1", "Index": 3, "Addresses": ["172.16.5.20/20"]}]),
    );
    mock.respond(Method::GET, "/subnets", json!([]));
    mock.respond(Method::GET, "/machines", json!([]));
    mock.respond(Method::GET, "/prefs", json!({"defaultBootEnv": "sledgehammer"}));
    mock
}

#[test]
fn test_range_examples() {
    assert_eq!(
        derive_range("192.168.1.77", 24).unwrap(),
        (Ipv4Addr::new(192, 168, 1, 0), Ipv4Addr::new(192, 168, 1, 255))
    );
    assert_eq!(
        derive_range("10.1.2.3", 8).unwrap(),
        (Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 255, 255, 255))
    );
    assert_eq!(
        derive_range("10.1.2.3", 32).unwrap(),
        (Ipv4Addr::new(10, 1, 2, 3), Ipv4Addr::new(10, 1, 2, 3))
    );
    assert!(derive_range("10.1.2", 24).is_err());
    assert!(derive_range("10.1.2.3", 33).is_err());
}

#[tokio::test]
async fn test_full_workflow() {
    let mut console = Console::new(server());

    // password login exchanges for a token
    let grant = console
        .login(Credential::parse("admin:secret"))
        .await
        .expect("login");
    assert_eq!(grant.token.as_deref(), Some("tok-1"));
    assert_eq!(grant.available_bootenvs, vec!["sledgehammer", "local"]);
    assert!(console.session().has_access());

    assert!(console.refresh().await.is_empty());
    let subnets = console.store(EntityKind::Subnet);
    assert!(subnets.is_empty());
    assert_eq!(subnets.interfaces().len(), 1);

    // new subnet from the interface, range derived from /20
    let store = console.store_mut(EntityKind::Subnet);
    let index = store.add_from_interface("eth1", "172.16.5.20/20").unwrap();
    let record = store.get(index).unwrap();
    assert_eq!(record.state(), RecordState::New);
    assert_eq!(record.field_str("ActiveStart"), "172.16.0.0");
    assert_eq!(record.field_str("ActiveEnd"), "172.16.15.255");
    assert_eq!(record.field_str("NextServer"), "172.16.5.20");
    assert!(record.field("IP").is_none());

    store
        .edit(index, map(json!({"Strategy": "UUID", "_errorMessage": "ignored"})))
        .unwrap();
    assert!(store.get(index).unwrap().field("_errorMessage").is_none());

    console.client().source().respond(
        Method::POST,
        "/subnets",
        json!({"Name": "eth1", "Subnet": "172.16.5.20/20", "Strategy": "UUID"}),
    );
    let store = console.store_mut(EntityKind::Subnet);
    store.save(index).await.unwrap();
    assert_eq!(store.get(index).unwrap().state(), RecordState::Clean);
    assert!(store.interfaces().is_empty());

    // every call after login carries the exchanged token
    let requests = console.client().source().requests();
    let post = requests
        .iter()
        .find(|r| r.method == Method::POST)
        .expect("POST sent");
    assert_eq!(post.authorization.as_deref(), Some("Bearer tok-1"));
    assert!(post.body.as_ref().unwrap().get("_errorMessage").is_none());
    assert!(requests
        .iter()
        .any(|r| r.authorization.as_deref() == Some(BASIC_ADMIN)));

    // delete it again
    console
        .client()
        .source()
        .respond(Method::DELETE, "/subnets/eth1", json!({"Name": "eth1"}));
    let store = console.store_mut(EntityKind::Subnet);
    store.remove(index).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_save_failure_then_retry() {
    let mut console = Console::new(server());
    console.refresh().await;
    console.client().source().fail(
        Method::POST,
        "/machines",
        RemoteError::new(400, &["Name must be unique", "Address in use"]),
    );

    let store = console.store_mut(EntityKind::Machine);
    let index = store.add(map(json!({"Name": "node7"}))).unwrap();
    let err = store.save(index).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Save { kind: EntityKind::Machine, .. }));

    let record = store.get(index).unwrap();
    assert_eq!(record.state(), RecordState::Error);
    assert!(record.is_new());
    assert_eq!(
        record.error_message(),
        Some("(400): Name must be unique, Address in use")
    );

    store.edit(index, map(json!({"Name": "node8"}))).unwrap();
    assert_eq!(store.get(index).unwrap().error_message(), None);

    console.client().source().respond(
        Method::POST,
        "/machines",
        json!({"Name": "node8", "Uuid": "c9a4e3d2-0000-4000-8000-000000000008"}),
    );
    let store = console.store_mut(EntityKind::Machine);
    store.save(index).await.unwrap();
    let record = store.get(index).unwrap();
    assert_eq!(record.key(), "c9a4e3d2-0000-4000-8000-000000000008");
    assert_eq!(record.state(), RecordState::Clean);

    // the key of a persisted machine is frozen
    let err = store
        .edit(index, map(json!({"Uuid": "something-else"})))
        .unwrap_err();
    assert!(matches!(err, ConsoleError::ImmutableKey { .. }));
}

#[tokio::test]
async fn test_interleaved_operations() {
    let mut console = Console::new(server());
    console.client().source().respond(
        Method::GET,
        "/bootenvs",
        json!([{"Name": "a"}, {"Name": "b"}, {"Name": "c"}]),
    );
    console.refresh().await;
    console
        .client()
        .source()
        .respond(Method::DELETE, "/bootenvs/a", Value::Null);
    console
        .client()
        .source()
        .respond(Method::PUT, "/bootenvs/c", json!({"Name": "c", "Kernel": "vmlinuz"}));

    let store = console.store_mut(EntityKind::BootEnv);
    store.edit(2, map(json!({"Kernel": "vmlinuz"}))).unwrap();
    let delete = store.begin_remove(0).unwrap().unwrap();
    let save = store.begin_save(2).unwrap();
    assert!(matches!(store.begin_save(2), Err(ConsoleError::Busy(2))));

    let delete_result = store.execute(&delete).await;
    let save_result = store.execute(&save).await;

    // delete lands first and shifts the saved record to index 1
    assert_eq!(
        store.complete(&delete, delete_result).unwrap(),
        Completion::Removed { key: "a".to_string() }
    );
    assert_eq!(
        store.complete(&save, save_result).unwrap(),
        Completion::Saved { index: 1 }
    );
    assert_eq!(store.get(1).unwrap().field_str("Kernel"), "vmlinuz");
    assert!(store.records().iter().all(|r| !r.is_updating()));
}

#[tokio::test]
async fn test_unreachable_server() {
    let mut console = Console::new(MockSource::new());
    for kind in EntityKind::ALL {
        console
            .client()
            .source()
            .fail(Method::GET, kind.collection_path(), RemoteError::unreachable());
    }
    console
        .client()
        .source()
        .fail(Method::GET, "/interfaces", RemoteError::unreachable());

    let err = console
        .login(Credential::Bearer("abc".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(RemoteError { status: 0, .. })));
    assert!(console.session().authorization().is_none());
    assert_eq!(console.refresh().await.len(), 4);
}

#[tokio::test]
async fn test_newest_login_wins() {
    let console = Console::new(MockSource::new());
    let mock = console.client().source();
    mock.route(
        MockRoute::ok(Method::GET, "/bootenvs", json!([{"Name": "old", "Available": true}]))
            .when_authorized("Bearer slow")
            .delayed(Duration::from_millis(200)),
    );
    mock.route(
        MockRoute::ok(Method::GET, "/bootenvs", json!([{"Name": "new", "Available": true}]))
            .when_authorized("Bearer fast"),
    );

    let slow = spawn_login(console.client(), Credential::Bearer("slow".to_string()));
    let fast = spawn_login(console.client(), Credential::Bearer("fast".to_string()));

    assert!(fast.await.unwrap().is_ok());
    assert!(slow.await.unwrap_err().is_cancelled());
    assert_eq!(console.session().available_bootenvs(), vec!["new"]);
    assert_eq!(
        console.session().authorization().as_deref(),
        Some("Bearer fast")
    );
}
