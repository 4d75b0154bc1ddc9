// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job runtime state: the mutable spec, observables, and the
//! synchronization primitives the supervisor and dispatcher need.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rooster_core::{JobSpec, Observables};
use tokio_util::sync::CancellationToken;

/// One entry in the job table. Cheap to clone (`Arc<JobHandle>` is the
/// unit of sharing); the struct itself owns no `Arc`s internally.
pub struct JobHandle {
    pub spec: RwLock<JobSpec>,
    pub observables: RwLock<Observables>,
    pub runtime_log_path: RwLock<Option<PathBuf>>,
    cancel: RwLock<Option<CancellationToken>>,
    running_loop: AtomicBool,
    registered: AtomicBool,
    consecutive_failures: AtomicU32,
    /// Narrow critical section around start/stop/save transitions for this
    /// job. `tokio::sync::Mutex` because it is held across `.await` points.
    pub conf_lock: Arc<tokio::sync::Mutex<()>>,
    /// Try-lock preventing overlapping scheduled invocations.
    run_once: Arc<tokio::sync::Mutex<()>>,
}

impl JobHandle {
    pub fn new(spec: JobSpec) -> Self {
        Self {
            spec: RwLock::new(spec),
            observables: RwLock::new(Observables::default()),
            runtime_log_path: RwLock::new(None),
            cancel: RwLock::new(None),
            running_loop: AtomicBool::new(false),
            registered: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            conf_lock: Arc::new(tokio::sync::Mutex::new(())),
            run_once: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn uuid(&self) -> String {
        self.spec.read().uuid.clone()
    }

    pub fn is_running_loop(&self) -> bool {
        self.running_loop.load(Ordering::SeqCst)
    }

    pub fn set_running_loop(&self, value: bool) {
        self.running_loop.store(value, Ordering::SeqCst);
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn set_registered(&self, value: bool) {
        self.registered.store(value, Ordering::SeqCst);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn increment_failures(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install a fresh cancellation token for a new Executor invocation,
    /// returning it for the caller to pass through.
    pub fn arm_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.write() = Some(token.clone());
        token
    }

    pub fn disarm_cancel(&self) {
        *self.cancel.write() = None;
    }

    /// Request graceful termination of the job's live Executor invocation,
    /// if any. Non-blocking: the supervisor loop observes the token and
    /// the Manager's `run=false` flag on its own schedule.
    pub fn cancel(&self) {
        if let Some(token) = self.cancel.read().as_ref() {
            token.cancel();
        }
    }

    /// Try to acquire the overlap-prevention lock for a scheduled fire.
    /// Returns `None` (no queueing) if a prior invocation is still
    /// running.
    pub fn try_run_once(&self) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        self.run_once.clone().try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rooster_core::{JobType, RunOptions};

    fn spec() -> JobSpec {
        JobSpec {
            uuid: "h1".into(),
            job_name: "demo".into(),
            link: String::new(),
            job_type: JobType::Resident,
            run: true,
            bin_path: "true".into(),
            dir: String::new(),
            spec: String::new(),
            options: RunOptions::default(),
        }
    }

    #[test]
    fn failure_counter_resets_and_increments() {
        let handle = JobHandle::new(spec());
        assert_eq!(handle.increment_failures(), 1);
        assert_eq!(handle.increment_failures(), 2);
        handle.reset_failures();
        assert_eq!(handle.consecutive_failures(), 0);
    }

    #[test]
    fn cancel_without_armed_token_is_a_noop() {
        let handle = JobHandle::new(spec());
        handle.cancel();
    }
}
