// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves where `jobConfig.json` lives: normally `$HOME/.roosterTaskConfig`,
//! but relocatable under a `dev.toml` found by walking up from the working
//! directory when running under a test harness.

use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = ".roosterTaskConfig";

/// Heuristic equivalent of Go's `testing.Testing()`: true when the running
/// binary looks like a `cargo test` harness (lives under `target/.../deps`,
/// or was invoked with a `--test-threads`/`--nocapture`-style flag).
pub fn running_under_test_harness() -> bool {
    if std::env::args().any(|a| a.starts_with("--test") || a == "--nocapture") {
        return true;
    }
    std::env::current_exe()
        .ok()
        .map(|exe| {
            let s = exe.to_string_lossy();
            s.contains("/target/") && s.contains("/deps/")
        })
        .unwrap_or(false)
}

fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// Walk up from `start` looking for `dev.toml` (stop immediately) or
/// `Cargo.toml` (a project root), at most `max_depth` levels.
fn find_project_root(start: &Path, max_depth: usize) -> Option<PathBuf> {
    if file_exists(&start.join("dev.toml")) || file_exists(&start.join("Cargo.toml")) {
        return Some(start.to_path_buf());
    }
    let mut cur = start.to_path_buf();
    for _ in 0..max_depth {
        let Some(parent) = cur.parent() else { break };
        cur = parent.to_path_buf();
        if file_exists(&cur.join("Cargo.toml")) {
            return Some(cur);
        }
    }
    None
}

#[derive(Debug, Default, serde::Deserialize)]
struct DevConfig {
    #[serde(default, rename = "useDevPath")]
    use_dev_path: bool,
}

/// `Some(dir)` when running under a test harness and a `dev.toml` with
/// `useDevPath = true` is found above the working directory; `None`
/// otherwise, in which case the caller should fall back to the real home
/// directory.
fn dev_home_dir() -> Option<PathBuf> {
    if !running_under_test_harness() {
        return None;
    }
    let wd = std::env::current_dir().ok()?;
    let root = find_project_root(&wd, 5)?;
    let dev_toml = root.join("dev.toml");
    let contents = std::fs::read_to_string(&dev_toml).ok()?;
    let config: DevConfig = toml::from_str(&contents).ok()?;
    if config.use_dev_path {
        Some(root)
    } else {
        None
    }
}

/// The directory `jobConfig.json` and the default `log/` directory live
/// under.
pub fn config_dir() -> PathBuf {
    if let Some(dev_root) = dev_home_dir() {
        return dev_root.join(CONFIG_DIR_NAME);
    }
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("jobConfig.json")
}

pub fn default_log_dir() -> PathBuf {
    config_dir().join("log")
}
