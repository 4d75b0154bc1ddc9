// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime observables: the fields that change while a job runs, kept
//! separate from its static [`crate::job::JobSpec`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a job's supervisor loop currently has a child process alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Stop,
    Running,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Stop
    }
}

/// The outcome of one completed process run, as handed back by
/// `rooster-engine`'s executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub exit_code: i32,
    pub error: Option<String>,
}

/// Observable state tracked per job, updated by the supervisor as a job
/// starts, runs and exits. `last_exit_code` defaults to `-1`, matching a
/// job that has never completed a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observables {
    pub status: JobStatus,
    pub last_start: Option<DateTime<Utc>>,
    pub last_exit: Option<DateTime<Utc>>,
    pub last_exit_code: i32,
    #[serde(with = "duration_millis_opt")]
    pub last_duration: Option<Duration>,
    pub pid: Option<u32>,
}

impl Default for Observables {
    fn default() -> Self {
        Self {
            status: JobStatus::Stop,
            last_start: None,
            last_exit: None,
            last_exit_code: -1,
            last_duration: None,
            pid: None,
        }
    }
}

impl Observables {
    /// Apply the result of a finished run: records exit fields and flips
    /// status back to stopped. The supervisor sets `status = Running` and
    /// `pid`/`last_start` itself when the child is spawned.
    pub fn record_exit(&mut self, result: &ExecutionResult) {
        self.status = JobStatus::Stop;
        self.pid = None;
        self.last_start = Some(result.start_time);
        self.last_exit = Some(result.end_time);
        self.last_exit_code = result.exit_code;
        self.last_duration = Some(result.duration);
    }
}

mod duration_millis_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.as_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_prior_run() {
        let obs = Observables::default();
        assert_eq!(obs.status, JobStatus::Stop);
        assert_eq!(obs.last_exit_code, -1);
        assert!(obs.last_duration.is_none());
    }

    #[test]
    fn record_exit_clears_pid_and_sets_exit_fields() {
        let mut obs = Observables::default();
        obs.status = JobStatus::Running;
        obs.pid = Some(1234);
        let start = Utc::now();
        let end = start + chrono::Duration::seconds(2);
        obs.record_exit(&ExecutionResult {
            start_time: start,
            end_time: end,
            duration: Duration::from_secs(2),
            exit_code: 0,
            error: None,
        });
        assert_eq!(obs.status, JobStatus::Stop);
        assert!(obs.pid.is_none());
        assert_eq!(obs.last_exit_code, 0);
        assert_eq!(obs.last_duration, Some(Duration::from_secs(2)));
    }

    #[test]
    fn observables_serialize_duration_as_millis() {
        let mut obs = Observables::default();
        obs.last_duration = Some(Duration::from_millis(1500));
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["lastDuration"], 1500);
    }
}
