#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a configured `anisuggest` command suitable for integration tests.
///
/// The cache lives in `data_dir` and no user config file is picked up.
#[allow(dead_code)]
pub fn anisuggest_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("anisuggest"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("ANISUGGEST_DATA_DIR", data_dir);
    cmd.env("ANISUGGEST_CONFIG", data_dir.join("missing-config.toml"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a config pointing the engine at `api_url` with a short debounce.
#[allow(dead_code)]
pub fn write_config(dir: &Path, api_url: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        "[site]\napi_url = \"{api_url}\"\n\n[request]\ndebounce_ms = 5\ntimeout_secs = 5\n"
    );
    std::fs::write(&path, content).expect("write config");
    path
}
