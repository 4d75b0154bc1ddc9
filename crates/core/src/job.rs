// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted job model: [`JobSpec`], [`RunOptions`] and the document
//! they live in, [`JobConfig`].

use serde::{Deserialize, Serialize};

use crate::ids::generate_uuid;

/// Discipline a job runs under.
///
/// Encoded on the wire as the integers the original dashboard schema used
/// (`1`/`2`), not as a string, so the JSON document round-trips unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JobType {
    Resident = 1,
    Scheduled = 2,
}

impl TryFrom<u8> for JobType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(JobType::Resident),
            2 => Ok(JobType::Scheduled),
            other => Err(format!("invalid job type: {other}")),
        }
    }
}

impl From<JobType> for u8 {
    fn from(value: JobType) -> Self {
        value as u8
    }
}

impl Serialize for JobType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(u8::from(*self))
    }
}

impl<'de> Deserialize<'de> for JobType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        JobType::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Where a job's child process output is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputType {
    Std = 1,
    File = 2,
}

impl TryFrom<u8> for OutputType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OutputType::Std),
            2 => Ok(OutputType::File),
            other => Err(format!("invalid output type: {other}")),
        }
    }
}

impl From<OutputType> for u8 {
    fn from(value: OutputType) -> Self {
        value as u8
    }
}

impl Serialize for OutputType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(u8::from(*self))
    }
}

impl<'de> Deserialize<'de> for OutputType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        OutputType::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Per-job run tunables. A zero/empty field means "inherit from
/// [`BaseConfig::default_options`]".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(default = "default_output_type")]
    pub output_type: OutputType,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub max_failures: i64,
    #[serde(default)]
    pub shell_path: String,
    #[serde(default)]
    pub min_run_seconds: i64,
}

fn default_output_type() -> OutputType {
    OutputType::File
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_type: OutputType::File,
            output_path: String::new(),
            max_failures: 0,
            shell_path: String::new(),
            min_run_seconds: 0,
        }
    }
}

impl RunOptions {
    /// Fill any zero-valued field from `defaults`, in place.
    pub fn merge_defaults(&mut self, defaults: &RunOptions) {
        if self.output_path.is_empty() {
            self.output_path = defaults.output_path.clone();
        }
        if self.max_failures == 0 {
            self.max_failures = defaults.max_failures;
        }
        if self.min_run_seconds == 0 {
            self.min_run_seconds = defaults.min_run_seconds;
        }
        if self.shell_path.is_empty() {
            self.shell_path = defaults.shell_path.clone();
        }
    }
}

/// A persisted job definition: the static declaration of what to run and
/// how. Runtime observables (status, pid, last-exit fields) live alongside
/// this in the daemon's job table, keyed by `uuid` — see `rooster-daemon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default)]
    pub uuid: String,
    pub job_name: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub run: bool,
    pub bin_path: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub options: RunOptions,
}

impl JobSpec {
    /// The `"<uuid>:<jobName>"` identity string used in log messages.
    pub fn display_name(&self) -> String {
        format!("{}:{}", self.uuid, self.job_name)
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub default_options: RunOptions,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self { dashboard: DashboardConfig::default(), default_options: RunOptions::default() }
    }
}

/// The whole persisted document: `taskList` plus process-wide `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    #[serde(default)]
    pub task_list: Vec<JobSpec>,
    #[serde(default)]
    pub config: BaseConfig,
}

impl JobConfig {
    pub fn resident_tasks(&self) -> impl Iterator<Item = &JobSpec> {
        self.task_list.iter().filter(|j| j.job_type == JobType::Resident)
    }

    pub fn scheduled_tasks(&self) -> impl Iterator<Item = &JobSpec> {
        self.task_list.iter().filter(|j| j.job_type == JobType::Scheduled)
    }

    pub fn get(&self, uuid: &str) -> Option<&JobSpec> {
        self.task_list.iter().find(|j| j.uuid == uuid)
    }

    pub fn get_mut(&mut self, uuid: &str) -> Option<&mut JobSpec> {
        self.task_list.iter_mut().find(|j| j.uuid == uuid)
    }

    /// Assign a uuid and apply `config.defaultOptions` to any zero-valued
    /// field, then append. Mirrors the original `ConfigInit` step.
    pub fn add_job(&mut self, mut job: JobSpec) -> JobSpec {
        if job.uuid.is_empty() {
            job.uuid = generate_uuid();
        }
        job.options.merge_defaults(&self.config.default_options);
        self.task_list.push(job.clone());
        job
    }

    pub fn remove(&mut self, uuid: &str) -> bool {
        let before = self.task_list.len();
        self.task_list.retain(|j| j.uuid != uuid);
        self.task_list.len() != before
    }

    /// The two jobs a freshly bootstrapped config ships with: a resident
    /// echo loop and a once-a-minute scheduled tick.
    pub fn bootstrap_default(log_dir: &str) -> Self {
        let (shell_loop, tick) = if cfg!(windows) {
            ("for /l %i in (1,0,2) do (echo rooster & timeout /t 1)".to_string(), "echo tick".to_string())
        } else {
            ("while true; do echo rooster; sleep 1; done".to_string(), "echo tick".to_string())
        };
        let default_options = RunOptions {
            output_type: OutputType::File,
            output_path: log_dir.to_string(),
            max_failures: 5,
            shell_path: String::new(),
            min_run_seconds: 0,
        };
        let resident = JobSpec {
            uuid: String::new(),
            job_name: "echo-loop".to_string(),
            link: String::new(),
            job_type: JobType::Resident,
            run: true,
            bin_path: shell_loop,
            dir: String::new(),
            spec: String::new(),
            options: default_options.clone(),
        };
        let scheduled = JobSpec {
            uuid: String::new(),
            job_name: "tick".to_string(),
            link: String::new(),
            job_type: JobType::Scheduled,
            run: true,
            bin_path: tick,
            dir: String::new(),
            spec: "* * * * *".to_string(),
            options: default_options.clone(),
        };
        let mut config = JobConfig {
            task_list: vec![],
            config: BaseConfig {
                dashboard: DashboardConfig::default(),
                default_options,
            },
        };
        config.add_job(resident);
        config.add_job(scheduled);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_as_integer() {
        let json = serde_json::to_string(&JobType::Scheduled).unwrap();
        assert_eq!(json, "2");
        let back: JobType = serde_json::from_str("1").unwrap();
        assert_eq!(back, JobType::Resident);
        assert!(serde_json::from_str::<JobType>("3").is_err());
    }

    #[test]
    fn add_job_assigns_uuid_and_merges_defaults() {
        let mut config = JobConfig::default();
        config.config.default_options.max_failures = 7;
        let spec = JobSpec {
            uuid: String::new(),
            job_name: "demo".into(),
            link: String::new(),
            job_type: JobType::Resident,
            run: false,
            bin_path: "sleep 1".into(),
            dir: String::new(),
            spec: String::new(),
            options: RunOptions::default(),
        };
        let saved = config.add_job(spec);
        assert!(!saved.uuid.is_empty());
        assert_eq!(saved.options.max_failures, 7);
        assert_eq!(config.task_list.len(), 1);
    }

    #[test]
    fn remove_then_list_matches_pre_save_state() {
        let mut config = JobConfig::default();
        let before = config.clone();
        let saved = config.add_job(JobSpec {
            uuid: String::new(),
            job_name: "temp".into(),
            link: String::new(),
            job_type: JobType::Resident,
            run: false,
            bin_path: "true".into(),
            dir: String::new(),
            spec: String::new(),
            options: RunOptions::default(),
        });
        assert!(config.remove(&saved.uuid));
        assert_eq!(config, before);
    }

    #[test]
    fn bootstrap_default_has_two_jobs() {
        let config = JobConfig::bootstrap_default("/tmp/rooster-log");
        assert_eq!(config.task_list.len(), 2);
        assert_eq!(config.resident_tasks().count(), 1);
        assert_eq!(config.scheduled_tasks().count(), 1);
    }
}
