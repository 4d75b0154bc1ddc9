// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads and persists the single `jobConfig.json` document. Writes are
//! atomic (temp file + rename) and serialized by a mutex; failures are
//! logged, never propagated, since in-memory state remains authoritative
//! for the running process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rooster_core::JobConfig;

use crate::paths;

pub struct ConfigStore {
    path: PathBuf,
    log_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    /// Store rooted at the platform-resolved config directory
    /// (`$HOME/.roosterTaskConfig`, or a `dev.toml`-relocated directory
    /// under a test harness).
    pub fn discover() -> Self {
        Self::at(paths::config_file_path(), paths::default_log_dir())
    }

    pub fn at(path: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), log_dir: log_dir.into(), write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Load the document, writing and returning a fresh default if the
    /// file is missing or fails to parse.
    pub fn load(&self) -> JobConfig {
        let _guard = self.write_lock.lock();
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<JobConfig>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(error = %err, path = %self.path.display(), "jobConfig.json malformed, recreating default");
                    self.write_default_locked()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "jobConfig.json missing, creating default");
                self.write_default_locked()
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "failed to read jobConfig.json, recreating default");
                self.write_default_locked()
            }
        }
    }

    fn write_default_locked(&self) -> JobConfig {
        let config = JobConfig::bootstrap_default(&self.log_dir.to_string_lossy());
        if let Err(err) = self.save_inner(&config) {
            tracing::error!(error = %err, "failed to persist default jobConfig.json");
        }
        config
    }

    /// Marshal and atomically replace the document. Logs and swallows
    /// every failure: the in-memory `config` remains authoritative.
    pub fn save(&self, config: &JobConfig) {
        let _guard = self.write_lock.lock();
        if let Err(err) = self.save_inner(config) {
            tracing::error!(error = %err, path = %self.path.display(), "failed to save jobConfig.json");
        }
    }

    fn save_inner(&self, config: &JobConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.log_dir)?;
        let body = serde_json::to_vec_pretty(config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &body)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> ConfigStore {
        ConfigStore::at(dir.join("jobConfig.json"), dir.join("log"))
    }

    #[test]
    fn load_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let config = store.load();
        assert_eq!(config.task_list.len(), 2);
        assert!(dir.path().join("jobConfig.json").exists());
    }

    #[test]
    fn load_recreates_default_when_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobConfig.json"), "{ not json").unwrap();
        let store = store_in(dir.path());
        let config = store.load();
        assert_eq!(config.task_list.len(), 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut config = store.load();
        config.config.dashboard.port = 12345;
        store.save(&config);
        let reloaded = store.load();
        assert_eq!(reloaded.config.dashboard.port, 12345);
    }

    #[test]
    fn save_uses_atomic_rename_leaving_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let config = store.load();
        store.save(&config);
        assert!(!dir.path().join("jobConfig.json.tmp").exists());
    }
}
