mod support;

use std::io::Write;

use event_scheduler::gateway::config::{API_TIMEOUT_ENV, API_URL_ENV};
use event_scheduler::gateway::factory::GATEWAY_TYPE_ENV;
use event_scheduler::gateway::{
    ConfigError, GatewayConfig, GatewayFactory, GatewayType, HttpSettings,
};
use event_scheduler::models::Block;
use event_scheduler::services::custom_types::{
    create_custom_type, event_type_options, CustomTypeStore, JsonFileCustomTypeStore,
};

use support::with_scoped_env;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_round_trip() {
    let file = write_config(
        r#"
[gateway]
type = "http"

[http]
base_url = "http://scheduler.internal:8282/api/v1"
page_size = 25
"#,
    );

    let config = GatewayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.gateway_type().unwrap(), GatewayType::Http);
    assert_eq!(config.http.page_size, 25);
    assert_eq!(config.http.timeout_secs, 20);
}

#[test]
fn test_malformed_config_is_parse_error() {
    let file = write_config("[gateway\ntype = ");
    let err = GatewayConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[tokio::test]
async fn test_factory_from_local_config_file() {
    let file = write_config("[gateway]\ntype = \"memory\"\n");
    let gateway = GatewayFactory::from_config_file(file.path()).unwrap();
    assert!(gateway.health_check().await.unwrap());
    assert_eq!(gateway.list(1, 10).await.unwrap().total, 0);
}

#[test]
fn test_gateway_type_from_env() {
    with_scoped_env(&[(GATEWAY_TYPE_ENV, None), (API_URL_ENV, None)], || {
        assert_eq!(GatewayType::from_env(), GatewayType::Local);
    });

    with_scoped_env(
        &[(GATEWAY_TYPE_ENV, None), (API_URL_ENV, Some("http://localhost:9000"))],
        || {
            assert_eq!(GatewayType::from_env(), GatewayType::Http);
        },
    );

    with_scoped_env(
        &[(GATEWAY_TYPE_ENV, Some("local")), (API_URL_ENV, Some("http://localhost:9000"))],
        || {
            assert_eq!(GatewayType::from_env(), GatewayType::Local);
        },
    );

    with_scoped_env(&[(GATEWAY_TYPE_ENV, Some("pigeon"))], || {
        assert_eq!(GatewayType::from_env(), GatewayType::Local);
    });
}

#[test]
fn test_http_settings_from_env() {
    with_scoped_env(
        &[
            (API_URL_ENV, Some("http://localhost:9000/api/v1/")),
            (API_TIMEOUT_ENV, Some("3")),
        ],
        || {
            let settings = HttpSettings::from_env();
            assert_eq!(settings.normalized_base_url(), "http://localhost:9000/api/v1");
            assert_eq!(settings.timeout_secs, 3);
        },
    );

    with_scoped_env(
        &[(API_URL_ENV, None), (API_TIMEOUT_ENV, Some("soon"))],
        || {
            assert_eq!(HttpSettings::from_env(), HttpSettings::default());
        },
    );
}

#[test]
fn test_custom_types_persist_across_stores() {
    let dir = tempfile::tempdir().unwrap();

    let store = JsonFileCustomTypeStore::in_dir(dir.path());
    assert!(store.get().unwrap().is_empty());
    let workshop = create_custom_type(&store, "Workshop", "#3366ff").unwrap();
    let panel = create_custom_type(&store, " Panel ", "#ff8800").unwrap();
    assert_eq!((workshop.id, panel.id), (1, 2));
    assert_eq!(panel.name, "Panel");

    let reopened = JsonFileCustomTypeStore::in_dir(dir.path());
    let types = reopened.delete(workshop.id).unwrap();
    assert_eq!(types, vec![panel.clone()]);

    let options = event_type_options(&reopened.get().unwrap());
    let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["performance", "setup", "break", "other", "panel"]);

    // any type string is accepted by the model
    let block = Block::new("Q&A", 30).with_type(options[4].value.clone());
    assert_eq!(block.type_or_default(), "panel");
}
