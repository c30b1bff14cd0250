use crate::config::Settings;
use crate::engine::{GenerationEngine, JobTemplate};
use crate::shared::now_secs;
use serde::Serialize;
use std::fs;

pub const CHECK_OK: &str = "ok";
pub const CHECK_TEST_MODE: &str = "test_mode";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub api: String,
    pub timestamp: i64,
    pub storage: String,
    pub graph: String,
    pub engine: String,
    pub ok: bool,
}

pub fn check_health(settings: &Settings, engine: &dyn GenerationEngine) -> HealthReport {
    let storage = match fs::create_dir_all(&settings.runs_dir) {
        Ok(()) => CHECK_OK.to_string(),
        Err(err) => format!("error: {err}"),
    };

    let graph = if !settings.graph_path.exists() {
        format!("missing: {}", settings.graph_path.display())
    } else {
        match JobTemplate::load(&settings.graph_path) {
            Ok(_) => CHECK_OK.to_string(),
            Err(err) => format!("error: {err}"),
        }
    };

    let engine = if engine.is_offline() {
        CHECK_TEST_MODE.to_string()
    } else {
        match engine.probe() {
            Ok(()) => CHECK_OK.to_string(),
            Err(err) => format!("error: {err}"),
        }
    };

    let ok = [&storage, &graph, &engine]
        .iter()
        .all(|check| check.as_str() == CHECK_OK || check.as_str() == CHECK_TEST_MODE);
    HealthReport {
        api: CHECK_OK.to_string(),
        timestamp: now_secs(),
        storage,
        graph,
        engine,
        ok,
    }
}
