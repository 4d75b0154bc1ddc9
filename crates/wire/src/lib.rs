// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! rooster-wire: the JSON shapes carried over the HTTP surface. Every
//! struct here mirrors a request or response body from the dashboard API,
//! nothing more.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rooster_core::{JobSpec, JobStatus, JobType, Observables, OutputType, RunOptions};

/// The union of a job's static definition, its runtime observables, and
/// resolved log-file metadata — what `GET /job-list` and `POST
/// /save-task` trade in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
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

    #[serde(default)]
    pub status: JobStatus,
    pub last_start: Option<DateTime<Utc>>,
    pub last_exit: Option<DateTime<Utc>>,
    #[serde(default = "default_exit_code")]
    pub last_exit_code: i32,
    #[serde(default)]
    pub last_duration_ms: Option<u64>,

    #[serde(default)]
    pub real_log_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mod_time: String,
}

fn default_exit_code() -> i32 {
    -1
}

impl JobView {
    pub fn from_spec_and_observables(spec: &JobSpec, obs: &Observables) -> Self {
        Self {
            uuid: spec.uuid.clone(),
            job_name: spec.job_name.clone(),
            link: spec.link.clone(),
            job_type: spec.job_type,
            run: spec.run,
            bin_path: spec.bin_path.clone(),
            dir: spec.dir.clone(),
            spec: spec.spec.clone(),
            options: spec.options.clone(),
            status: obs.status,
            last_start: obs.last_start,
            last_exit: obs.last_exit,
            last_exit_code: obs.last_exit_code,
            last_duration_ms: obs.last_duration.map(|d| d.as_millis() as u64),
            real_log_path: String::new(),
            size: 0,
            mod_time: String::new(),
        }
    }

    /// The mutable fields `Save` accepts from a [`JobView`], applied onto
    /// an existing [`JobSpec`].
    pub fn into_spec(self) -> JobSpec {
        JobSpec {
            uuid: self.uuid,
            job_name: self.job_name,
            link: self.link,
            job_type: self.job_type,
            run: self.run,
            bin_path: self.bin_path,
            dir: self.dir,
            spec: self.spec,
            options: self.options,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdateRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCloseRequest {
    pub uuid: String,
    pub run: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskActionRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub job_id: String,
}

impl RemoveRequest {
    pub fn identity(&self) -> &str {
        if !self.uuid.is_empty() {
            &self.uuid
        } else {
            &self.job_id
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self { message: "success".to_string() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListResponse {
    pub message: Vec<JobView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePathResponse {
    pub home: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfoResponse {
    pub start: DateTime<Utc>,
    pub run_time_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobLogResponse {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobLogQuery {
    #[serde(default, rename = "jobId")]
    pub job_id: String,
    pub lines: Option<usize>,
    pub bytes: Option<usize>,
}

pub use rooster_core::OutputType as WireOutputType;
