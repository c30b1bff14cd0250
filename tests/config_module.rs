use adgen::config::{load_settings, ConfigError, EngineMode, Settings};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn from_pairs(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Settings::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn config_defaults_apply_when_nothing_is_set() {
    let settings = from_pairs(&[]).expect("settings");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.engine_url, "http://127.0.0.1:8188");
    assert_eq!(settings.poll_interval_secs, 2);
    assert_eq!(settings.poll_deadline_secs, 600);
    assert_eq!(settings.retention_window(), Duration::from_secs(24 * 3600));
    assert_eq!(settings.engine_mode, EngineMode::Api);
    settings.validate().expect("defaults validate");
}

#[test]
fn config_lookup_overrides_each_setting() {
    let settings = from_pairs(&[
        ("ADGEN_ENGINE_URL", "http://engine:8188/"),
        ("RUNS_DIR", "/data/runs"),
        ("GRAPH_PATH", "/data/graph.json"),
        ("POLL_INTERVAL_SECS", "1"),
        ("POLL_DEADLINE_SECS", "30"),
        ("RUN_RETENTION_HOURS", "6"),
        ("COMFY_MODE", "test"),
        ("ADGEN_LOG", "debug"),
    ])
    .expect("settings");

    assert_eq!(settings.engine_url, "http://engine:8188");
    assert_eq!(settings.runs_dir, PathBuf::from("/data/runs"));
    assert_eq!(settings.graph_path, PathBuf::from("/data/graph.json"));
    assert_eq!(settings.poll_policy().interval, Duration::from_secs(1));
    assert_eq!(settings.poll_policy().deadline, Duration::from_secs(30));
    assert_eq!(settings.retention_hours, 6);
    assert_eq!(settings.engine_mode, EngineMode::Test);
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn config_accepts_legacy_engine_keys_and_mode_alias() {
    let settings = from_pairs(&[
        ("COMFY_API", "https://legacy:9000"),
        ("COMFY_MODE", "production"),
        ("RUNS_DIR", "   "),
    ])
    .expect("settings");
    assert_eq!(settings.engine_url, "https://legacy:9000");
    assert_eq!(settings.engine_mode, EngineMode::Api);
    assert_eq!(settings.runs_dir, Settings::default().runs_dir);

    let preferred = from_pairs(&[
        ("COMFY_API", "http://legacy:1"),
        ("ADGEN_ENGINE_URL", "http://current:2"),
    ])
    .expect("settings");
    assert_eq!(preferred.engine_url, "http://current:2");
}

#[test]
fn config_rejects_unparseable_values() {
    let err = from_pairs(&[("POLL_INTERVAL_SECS", "soon")]).expect_err("bad number");
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "POLL_INTERVAL_SECS"));

    let err = from_pairs(&[("COMFY_MODE", "turbo")]).expect_err("bad mode");
    assert!(err.to_string().contains("turbo"));
}

#[test]
fn config_validation_catches_inconsistent_settings() {
    let mut settings = Settings::default();
    settings.poll_interval_secs = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.poll_interval_secs = 10;
    settings.poll_deadline_secs = 5;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.engine_url = "ftp://engine".to_string();
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.runs_dir = PathBuf::new();
    assert!(settings.validate().is_err());
}

#[test]
fn config_loads_yaml_files_with_partial_fields() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("adgen.yaml");
    fs::write(
        &path,
        "engine_url: http://gpu-box:8188/\nruns_dir: /srv/runs\nengine_mode: test\nretention_hours: 48\n",
    )
    .expect("write config");

    let settings = load_settings(Some(path.as_path())).expect("load");
    assert_eq!(settings.engine_url, "http://gpu-box:8188");
    assert_eq!(settings.runs_dir, PathBuf::from("/srv/runs"));
    assert_eq!(settings.engine_mode, EngineMode::Test);
    assert_eq!(settings.retention_hours, 48);
    assert_eq!(settings.poll_interval_secs, 2);

    fs::write(&path, "engine_mode: production\n").expect("write config");
    let settings = load_settings(Some(path.as_path())).expect("production alias");
    assert_eq!(settings.engine_mode, EngineMode::Api);

    fs::write(&path, "poll_interval_secs: 0\n").expect("write config");
    let err = load_settings(Some(path.as_path())).expect_err("invalid");
    assert!(matches!(err, ConfigError::Settings(_)));

    let err = load_settings(Some(temp.path().join("missing.yaml").as_path())).expect_err("missing");
    assert!(matches!(err, ConfigError::Read { .. }));

    fs::write(&path, "retention_hours: [1, 2]\n").expect("write config");
    let err = load_settings(Some(path.as_path())).expect_err("bad yaml");
    assert!(matches!(err, ConfigError::Parse { .. }));
}
