use std::{
    fs,
    path::{Path, PathBuf},
};

use log::*;
use serde_json::Value;

pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}

pub fn random_file_name(prefix: &str) -> String {
    format!("{prefix}_{}.json", rand::random::<u64>())
}

/// Writes `content` as pretty JSON to `dir/name` and returns the full path.
pub fn write_export_file<P: AsRef<Path>>(dir: P, name: &str, content: &Value) -> PathBuf {
    let path = dir.as_ref().join(name);
    let json = serde_json::to_string_pretty(content).expect("Error serializing test payload");
    fs::write(&path, json).expect("Error writing test export file");
    trace!("Wrote test export file {}", path.display());
    path
}
