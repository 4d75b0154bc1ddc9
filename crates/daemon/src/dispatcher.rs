// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven one-shot dispatch: each registered scheduled job gets its
//! own sleep-until-next-fire task, guarded by its handle's try-lock so an
//! overrunning invocation drops the next tick instead of queueing it.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use parking_lot::Mutex;
use rooster_core::Clock;
use rooster_logs::RingRegistry;
use tokio::task::JoinHandle;

use crate::handle::JobHandle;

#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("invalid cron expression: {0}")]
    InvalidSpec(String),
}

/// Owns one background task per registered job. `register`/`unregister`
/// are the only mutating entry points; everything else just reads.
pub struct ScheduledDispatcher {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Default for ScheduledDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduledDispatcher {
    pub fn new() -> Self {
        Self { tasks: Mutex::new(HashMap::new()) }
    }

    pub fn is_registered(&self, uuid: &str) -> bool {
        self.tasks.lock().contains_key(uuid)
    }

    /// Parse `job.spec` and spawn its fire loop. A no-op if already
    /// registered.
    pub fn register<C: Clock>(
        &self,
        handle: Arc<JobHandle>,
        clock: C,
        ring_registry: Arc<RingRegistry>,
    ) -> Result<(), DispatcherError> {
        let uuid = handle.uuid();
        if self.tasks.lock().contains_key(&uuid) {
            return Ok(());
        }
        let raw_spec = handle.spec.read().spec.clone();
        let cron_expr = to_cron_expression(&raw_spec);
        let schedule = Schedule::from_str(&cron_expr).map_err(|e| DispatcherError::InvalidSpec(e.to_string()))?;

        let task = tokio::spawn(fire_loop(handle, schedule, clock, ring_registry));
        self.tasks.lock().insert(uuid, task);
        Ok(())
    }

    pub fn unregister(&self, uuid: &str) {
        if let Some(task) = self.tasks.lock().remove(uuid) {
            task.abort();
        }
    }

    pub fn unregister_all(&self) {
        let mut tasks = self.tasks.lock();
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

/// The `cron` crate always expects a leading seconds field; the standard
/// five-field grammar this engine accepts (minute hour day month weekday)
/// is widened by prepending `0` unless a seconds field was already given.
fn to_cron_expression(spec: &str) -> String {
    let field_count = spec.split_whitespace().count();
    if field_count >= 6 {
        spec.to_string()
    } else {
        format!("0 {spec}")
    }
}

async fn fire_loop<C: Clock>(handle: Arc<JobHandle>, schedule: Schedule, clock: C, ring_registry: Arc<RingRegistry>) {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else { break };
        let wait = (next - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
        tokio::time::sleep(wait).await;

        if !handle.spec.read().run {
            continue;
        }

        let Some(_guard) = handle.try_run_once() else {
            tracing::info!(job = %handle.uuid(), "scheduled tick dropped: prior invocation still running");
            continue;
        };

        let job_snapshot = handle.spec.read().clone();
        let token = handle.arm_cancel();
        let handle_for_start = handle.clone();
        let outcome = rooster_engine::execute(&clock, token, &job_snapshot, &ring_registry, move |pid| {
            let mut obs = handle_for_start.observables.write();
            obs.status = rooster_core::JobStatus::Running;
            obs.pid = Some(pid);
            obs.last_start = Some(chrono::Utc::now());
        })
        .await;
        handle.disarm_cancel();

        let mut obs = handle.observables.write();
        obs.record_exit(&outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rooster_core::{JobSpec, JobType, RunOptions, SystemClock};

    fn scheduled_spec(cron_spec: &str) -> JobSpec {
        JobSpec {
            uuid: "sched-test".into(),
            job_name: "sched-test".into(),
            link: String::new(),
            job_type: JobType::Scheduled,
            run: true,
            bin_path: "true".into(),
            dir: String::new(),
            spec: cron_spec.to_string(),
            options: RunOptions::default(),
        }
    }

    #[tokio::test]
    async fn register_rejects_invalid_cron_spec() {
        let dispatcher = ScheduledDispatcher::new();
        let handle = Arc::new(JobHandle::new(scheduled_spec("not a cron spec")));
        let result = dispatcher.register(handle, SystemClock, Arc::new(RingRegistry::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn register_twice_is_idempotent() {
        let dispatcher = ScheduledDispatcher::new();
        let handle = Arc::new(JobHandle::new(scheduled_spec("0 0 1 1 *")));
        dispatcher.register(handle.clone(), SystemClock, Arc::new(RingRegistry::new())).unwrap();
        dispatcher.register(handle.clone(), SystemClock, Arc::new(RingRegistry::new())).unwrap();
        assert!(dispatcher.is_registered(&handle.uuid()));
        dispatcher.unregister(&handle.uuid());
        assert!(!dispatcher.is_registered(&handle.uuid()));
    }
}
