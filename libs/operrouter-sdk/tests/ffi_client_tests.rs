#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::path::Path;

use common::{
    NativeMode, conversation, native_client, native_counters, native_last_arg,
    native_last_raw_arg, native_session, new_user, postgres, set_native_mode,
};
use operrouter_sdk::{
    DataSourceConfig, FfiClient, OperRouterClientV1, OperRouterError, Row, TransportKind,
};
use serde_json::json;

#[tokio::test]
async fn test_ping_releases_reply() {
    let _session = native_session().await;
    let client = native_client();

    let resp = client.ping().await.unwrap();

    assert!(resp.success);
    assert_eq!(native_counters(), (1, 1));
    assert_eq!(native_last_arg().unwrap().0, "operrouter_ping");
}

#[tokio::test]
async fn test_every_reply_released_exactly_once() {
    let _session = native_session().await;
    let client = native_client();

    client.create_datasource("main", &postgres()).await.unwrap();
    client.query_datasource("main", common::QUERY).await.unwrap();
    client.insert_datasource("main", &new_user()).await.unwrap();
    client.chat_llm("bot", &conversation()).await.unwrap();
    client.embedding_llm("bot", "vectorize me").await.unwrap();
    client.close_datasource("main").await.unwrap();

    assert_eq!(native_counters(), (6, 6));
}

#[tokio::test]
async fn test_error_shaped_reply_is_released_and_returned() {
    let _session = native_session().await;
    set_native_mode(NativeMode::ErrorShaped);
    let client = native_client();

    let resp = client.create_datasource("main", &postgres()).await.unwrap();

    assert!(!resp.success);
    assert_eq!(resp.message, "datasource.create failed");
    assert_eq!(native_counters(), (1, 1));
}

#[tokio::test]
async fn test_null_reply_is_transport_error_and_nothing_released() {
    let _session = native_session().await;
    set_native_mode(NativeMode::Null);
    let client = native_client();

    let err = client.ping_llm("bot").await.unwrap_err();

    assert!(matches!(
        err,
        OperRouterError::Transport {
            transport: TransportKind::Ffi,
            ..
        }
    ));
    assert_eq!(native_counters(), (0, 0));
}

#[tokio::test]
async fn test_unparseable_reply_is_malformed_and_released() {
    let _session = native_session().await;
    set_native_mode(NativeMode::Garbage);
    let client = native_client();

    let err = client.generate_llm("bot", "hi").await.unwrap_err();

    assert!(matches!(
        err,
        OperRouterError::MalformedResponse {
            transport: TransportKind::Ffi,
            ..
        }
    ));
    assert_eq!(native_counters(), (1, 1));
}

#[tokio::test]
async fn test_successful_metadata_without_payload_is_malformed() {
    let _session = native_session().await;
    set_native_mode(NativeMode::BareSuccess);
    let client = native_client();

    let err = client.get_metadata().await.unwrap_err();

    assert!(matches!(
        err,
        OperRouterError::MalformedResponse {
            transport: TransportKind::Ffi,
            ..
        }
    ));
    assert_eq!(native_counters(), (1, 1));
}

#[tokio::test]
async fn test_arguments_use_text_envelope_shapes() {
    let _session = native_session().await;
    let client = native_client();

    client.create_datasource("main", &postgres()).await.unwrap();
    let (symbol, params) = native_last_arg().unwrap();
    assert_eq!(symbol, "operrouter_datasource_create");
    assert_eq!(params["name"], "main");
    let sent: DataSourceConfig = serde_json::from_value(params["config"].clone()).unwrap();
    assert_eq!(sent, postgres());

    client.insert_datasource("main", &new_user()).await.unwrap();
    let (_, params) = native_last_arg().unwrap();
    let sent: Row = serde_json::from_value(params["data"].clone()).unwrap();
    assert_eq!(sent, new_user());

    client.get_metadata().await.unwrap();
    let (symbol, params) = native_last_arg().unwrap();
    assert_eq!(symbol, "operrouter_get_metadata");
    assert_eq!(params, json!({}));
}

#[tokio::test]
async fn test_config_symbols_receive_bare_arguments() {
    let _session = native_session().await;
    let client = native_client();

    let resp = client.load_config("/etc/operrouter/config.yaml").await.unwrap();
    assert!(resp.success);
    let (symbol, raw) = native_last_raw_arg().unwrap();
    assert_eq!(symbol, "operrouter_load_config");
    assert_eq!(raw, "/etc/operrouter/config.yaml");

    let config = json!({"datasources": {"main": {"driver": "postgres"}}});
    client.validate_config(&config).await.unwrap();
    let (symbol, raw) = native_last_raw_arg().unwrap();
    assert_eq!(symbol, "operrouter_validate_config");
    assert_eq!(raw, config.to_string());

    assert_eq!(native_counters(), (2, 2));
}

#[tokio::test]
async fn test_close_datasource_twice() {
    let _session = native_session().await;
    let client = native_client();
    client.create_datasource("main", &postgres()).await.unwrap();

    let first = client.close_datasource("main").await.unwrap();
    let second = client.close_datasource("main").await.unwrap();

    assert!(first.success);
    assert!(!second.success);
    assert!(second.message.contains("not found"));
}

#[tokio::test]
async fn test_invalid_argument_makes_no_call() {
    let _session = native_session().await;
    let client = native_client();

    let err = client.load_config("  ").await.unwrap_err();

    assert!(matches!(err, OperRouterError::InvalidArgument(_)));
    assert_eq!(native_counters(), (0, 0));
}

#[tokio::test]
async fn test_version_is_not_released() {
    let _session = native_session().await;
    let client = native_client();

    assert_eq!(client.version().as_deref(), Some("0.1.0-double"));
    assert_eq!(native_counters(), (0, 0));
}

#[test]
fn test_missing_library() {
    let err = FfiClient::load(Some(Path::new("/nonexistent/liboperrouter_core_ffi.so")))
        .unwrap_err();

    match err {
        OperRouterError::LibraryNotFound { candidates } => {
            assert_eq!(candidates[0], "/nonexistent/liboperrouter_core_ffi.so");
            assert!(candidates.iter().any(|c| c == "liboperrouter_core_ffi.so"));
            assert!(
                candidates
                    .iter()
                    .any(|c| c == "/usr/local/lib/liboperrouter_core_ffi.so")
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
