mod common;

use common::temp_config;
use screenlets::config::{Config, ConfigError, ConfigStore};
use screenlets::form::{FormSettings, UploadFailurePolicy};
use screenlets::list::{DdlListSource, ListSettings, PaginationSettings};
use screenlets::operation::CacheStrategy;
use screenlets::session::{Credentials, Session};

/// Test that Config::default() produces the expected values.
#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.server.base_url, "http://localhost:8080");
    assert_eq!(config.server.company_id, 0);
    assert_eq!(config.server.connect_timeout_seconds, 5);
    assert_eq!(config.server.timeout_seconds, 30);
    assert_eq!(config.cache.strategy(), CacheStrategy::RemoteFirst);
    assert_eq!(config.auth.method, "email");
    assert!(config.auth.username.is_none());
    assert_eq!(config.form.file_prefix, "form-file-");
    assert_eq!(config.form.upload_failure_policy, UploadFailurePolicy::Reset);
    assert_eq!(config.list.first_page_size, 50);
    assert_eq!(config.list.page_size, 25);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_path_ends_with_expected() {
    let path = Config::config_path();
    assert!(path.ends_with("screenlets/config.toml"));
}

#[test]
fn test_full_config_parses() {
    let (_dir, path) = temp_config(
        r#"
[server]
base_url = "https://portal.example.com"
company_id = 10157
group_id = 10184
timeout_seconds = 10

[cache]
policy = "cache-first"

[auth]
method = "user-id"
username = "10198"
password = "test"

[form]
structure_id = 21303
record_set_id = 21320
folder_id = 77
upload_failure_policy = "track-in-flight"

[list]
record_set_id = 21320
first_page_size = 20
page_size = 10
label_fields = ["name", "surname"]
"#,
    );

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.server.group_id, 10184);
    assert_eq!(config.server.timeout_seconds, 10);
    assert_eq!(config.cache.strategy(), CacheStrategy::CacheFirst);

    let form = FormSettings::from_config(&config);
    assert_eq!(form.structure_id, 21303);
    assert_eq!(form.repository_id, 10184);
    assert_eq!(form.folder_id, 77);
    assert_eq!(form.cache_strategy, CacheStrategy::CacheFirst);
    assert_eq!(form.upload_failure_policy, UploadFailurePolicy::TrackInFlight);

    let list = ListSettings::from_config(&config);
    assert_eq!(list.pagination, PaginationSettings::new(20, 10));
    let source = DdlListSource::from_config(&config);
    assert_eq!(source.record_set_id, 21320);
    assert_eq!(source.label_fields, vec!["name", "surname"]);

    let session = Session::from_config(&config);
    assert_eq!(session.company_id(), 10157);
    assert_eq!(session.credentials(), &Credentials::basic("10198", "test"));
}

#[test]
fn test_validation_rejects_unknown_policy() {
    let (_dir, path) = temp_config("[cache]\npolicy = \"sometimes\"\n");
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
    assert!(err.to_string().contains("sometimes"));
}

#[test]
fn test_validation_rejects_non_http_url() {
    let (_dir, path) = temp_config("[server]\nbase_url = \"ftp://portal\"\n");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn test_validation_rejects_zero_page_size() {
    let mut config = Config::default();
    config.list.page_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_upload_policy_is_parse_error() {
    let (_dir, path) = temp_config("[form]\nupload_failure_policy = \"never\"\n");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::ParseError { .. })
    ));
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn test_store_reload_picks_up_changes() {
    let (_dir, path) = temp_config("[form]\nstructure_id = 1\n");
    let store = ConfigStore::open(path.clone()).unwrap();
    assert_eq!(store.get().form.structure_id, 1);

    std::fs::write(&path, "[form]\nstructure_id = 2\n").unwrap();
    store.reload().unwrap();
    assert_eq!(store.get().form.structure_id, 2);
    assert_eq!(store.path(), path.as_path());
}
