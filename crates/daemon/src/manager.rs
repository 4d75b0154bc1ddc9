// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide coordinator: owns the job table, the config store and
//! the scheduled dispatcher, and mediates every CRUD and lifecycle
//! operation against them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rooster_core::{Clock, EngineError, JobType, Observables, SystemClock};
use rooster_logs::RingRegistry;
use rooster_storage::ConfigStore;
use rooster_wire::JobView;
use tokio::sync::Mutex as AsyncMutex;

use crate::dispatcher::ScheduledDispatcher;
use crate::handle::JobHandle;
use crate::resident;

pub struct Manager<C: Clock = SystemClock> {
    clock: C,
    store: Arc<ConfigStore>,
    jobs: Arc<RwLock<Vec<Arc<JobHandle>>>>,
    dispatcher: Arc<ScheduledDispatcher>,
    ring_registry: Arc<RingRegistry>,
    closing: Arc<AtomicBool>,
    config_lock: Arc<AsyncMutex<()>>,
    started_at: DateTime<Utc>,
    dashboard_port: u16,
}

/// Rewrite the on-disk config document from the live job table. Shared
/// between `Manager::flush_config` and the resident supervisor, which
/// has no borrow of `Manager` to call back into once its loop exits.
async fn flush(store: &ConfigStore, jobs: &RwLock<Vec<Arc<JobHandle>>>, lock: &AsyncMutex<()>) {
    let _guard = lock.lock().await;
    let task_list = jobs.read().iter().map(|j| j.spec.read().clone()).collect();
    let mut config = store.load();
    config.task_list = task_list;
    store.save(&config);
}

impl Manager<SystemClock> {
    pub fn discover() -> Self {
        Self::new(SystemClock, Arc::new(ConfigStore::discover()))
    }
}

impl<C: Clock> Manager<C> {
    pub fn new(clock: C, store: Arc<ConfigStore>) -> Self {
        let config = store.load();
        let dashboard_port = config.config.dashboard.port;
        let jobs = config.task_list.into_iter().map(|spec| Arc::new(JobHandle::new(spec))).collect();
        let started_at = clock.now_utc();
        Self {
            clock,
            store,
            jobs: Arc::new(RwLock::new(jobs)),
            dispatcher: Arc::new(ScheduledDispatcher::new()),
            ring_registry: Arc::new(RingRegistry::new()),
            closing: Arc::new(AtomicBool::new(false)),
            config_lock: Arc::new(AsyncMutex::new(())),
            started_at,
            dashboard_port,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn dashboard_port(&self) -> u16 {
        self.dashboard_port
    }

    pub fn home_path(&self) -> String {
        self.store.path().parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
    }

    pub fn ring_registry(&self) -> Arc<RingRegistry> {
        self.ring_registry.clone()
    }

    fn find(&self, uuid: &str) -> Option<Arc<JobHandle>> {
        self.jobs.read().iter().find(|j| j.uuid() == uuid).cloned()
    }

    async fn flush_config(&self) {
        flush(&self.store, &self.jobs, &self.config_lock).await;
    }

    /// Start every enabled resident job's supervisor loop and register
    /// every enabled scheduled job with the dispatcher. Called exactly
    /// once at process startup.
    pub async fn start(&self) {
        let jobs = self.jobs.read().clone();
        for job in jobs {
            let is_resident = job.spec.read().job_type == JobType::Resident;
            let run = job.spec.read().run;
            if is_resident && run {
                self.spawn_resident(job);
            } else if !is_resident && run {
                let uuid = job.uuid();
                if let Err(err) = self.register_scheduled(job) {
                    tracing::warn!(job = %uuid, error = %err, "failed to register scheduled job at startup");
                }
            }
        }
    }

    fn spawn_resident(&self, job: Arc<JobHandle>) {
        let clock = self.clock.clone();
        let ring_registry = self.ring_registry.clone();
        let closing = self.closing.clone();
        let store = self.store.clone();
        let jobs = self.jobs.clone();
        let config_lock = self.config_lock.clone();
        tokio::spawn(async move {
            resident::run(job, clock, ring_registry, closing).await;
            // The loop may have flipped `run` to false on its own (budget
            // exhaustion); persist that regardless of why it exited.
            flush(&store, &jobs, &config_lock).await;
        });
    }

    fn register_scheduled(&self, job: Arc<JobHandle>) -> Result<(), EngineError> {
        self.dispatcher
            .register(job.clone(), self.clock.clone(), self.ring_registry.clone())
            .map_err(|err| EngineError::Invalid(err.to_string()))?;
        job.set_registered(true);
        Ok(())
    }

    pub async fn start_resident(&self, uuid: &str) -> Result<(), EngineError> {
        let job = self.find(uuid).ok_or_else(|| EngineError::NotFound(uuid.to_string()))?;
        let _guard = job.conf_lock.clone().lock_owned().await;
        if job.is_running_loop() {
            return Err(EngineError::InProgress(uuid.to_string()));
        }
        job.spec.write().run = true;
        self.spawn_resident(job);
        self.flush_config().await;
        Ok(())
    }

    pub async fn force_run(&self, uuid: &str) -> Result<(), EngineError> {
        self.start_resident(uuid).await
    }

    pub async fn stop(&self, uuid: &str) -> Result<(), EngineError> {
        let job = self.find(uuid).ok_or_else(|| EngineError::NotFound(uuid.to_string()))?;
        let _guard = job.conf_lock.clone().lock_owned().await;
        job.spec.write().run = false;
        job.cancel();
        self.flush_config().await;
        Ok(())
    }

    pub async fn stop_all(&self) {
        self.closing.store(true, Ordering::SeqCst);
        let residents: Vec<_> =
            self.jobs.read().iter().filter(|j| j.spec.read().job_type == JobType::Resident).cloned().collect();
        for job in &residents {
            job.spec.write().run = false;
            job.cancel();
        }
        self.dispatcher.unregister_all();
        for job in residents {
            while job.is_running_loop() {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
        }
    }

    pub async fn open_close(&self, uuid: &str, run: bool) -> Result<(), EngineError> {
        let job = self.find(uuid).ok_or_else(|| EngineError::NotFound(uuid.to_string()))?;
        if job.spec.read().job_type != JobType::Scheduled {
            return Err(EngineError::Invalid("open-close only applies to scheduled jobs".into()));
        }
        if run {
            if job.is_registered() {
                return Err(EngineError::Conflict(uuid.to_string()));
            }
            self.register_scheduled(job.clone())?;
            job.spec.write().run = true;
        } else {
            if job.is_registered() {
                self.dispatcher.unregister(uuid);
                job.set_registered(false);
            }
            job.spec.write().run = false;
        }
        self.flush_config().await;
        Ok(())
    }

    pub async fn run_task(&self, uuid: &str) -> Result<(), EngineError> {
        let job = self.find(uuid).ok_or_else(|| EngineError::NotFound(uuid.to_string()))?;
        if job.spec.read().job_type != JobType::Scheduled {
            return Err(EngineError::Invalid("run-task only applies to scheduled jobs".into()));
        }
        let Some(_guard) = job.try_run_once() else {
            return Err(EngineError::InProgress(uuid.to_string()));
        };
        let job_snapshot = job.spec.read().clone();
        let token = job.arm_cancel();
        let job_for_start = job.clone();
        let outcome = rooster_engine::execute(&self.clock, token, &job_snapshot, &self.ring_registry, move |pid| {
            let mut obs = job_for_start.observables.write();
            obs.status = rooster_core::JobStatus::Running;
            obs.pid = Some(pid);
            obs.last_start = Some(chrono::Utc::now());
        })
        .await;
        job.disarm_cancel();
        job.observables.write().record_exit(&outcome);
        Ok(())
    }

    pub async fn save(&self, view: JobView) -> Result<JobView, EngineError> {
        if view.uuid.is_empty() {
            let mut spec = view.into_spec();
            let default_options = self.store.load().config.default_options;
            spec.options.merge_defaults(&default_options);
            spec.uuid = rooster_core::generate_uuid();
            let handle = Arc::new(JobHandle::new(spec.clone()));
            self.jobs.write().push(handle);
            self.flush_config().await;
            return Ok(JobView::from_spec_and_observables(&spec, &Observables::default()));
        }

        let job = self.find(&view.uuid).ok_or_else(|| EngineError::NotFound(view.uuid.clone()))?;
        {
            let spec = job.spec.read();
            if spec.run {
                return Err(EngineError::Conflict(view.uuid.clone()));
            }
            if spec.job_type != view.job_type {
                return Err(EngineError::Invalid("job type is immutable once assigned".into()));
            }
        }
        {
            let mut spec = job.spec.write();
            spec.job_name = view.job_name.clone();
            spec.run = view.run;
            spec.bin_path = view.bin_path.clone();
            spec.dir = view.dir.clone();
            spec.spec = view.spec.clone();
            spec.options = view.options.clone();
            spec.link = view.link.clone();
        }
        self.flush_config().await;
        let spec = job.spec.read().clone();
        let obs = job.observables.read().clone();
        Ok(JobView::from_spec_and_observables(&spec, &obs))
    }

    pub async fn remove(&self, uuid: &str) -> Result<(), EngineError> {
        let job = self.find(uuid).ok_or_else(|| EngineError::NotFound(uuid.to_string()))?;
        if job.spec.read().run {
            return Err(EngineError::Conflict(uuid.to_string()));
        }
        self.jobs.write().retain(|j| j.uuid() != uuid);
        self.ring_registry.remove(uuid);
        self.flush_config().await;
        Ok(())
    }

    pub fn list(&self) -> Vec<JobView> {
        self.jobs
            .read()
            .iter()
            .map(|job| {
                let spec = job.spec.read().clone();
                let obs = job.observables.read().clone();
                let mut view = JobView::from_spec_and_observables(&spec, &obs);
                self.fill_log_metadata(job, &mut view);
                view
            })
            .collect()
    }

    fn fill_log_metadata(&self, job: &Arc<JobHandle>, view: &mut JobView) {
        let path = job.runtime_log_path.read().clone().unwrap_or_else(|| {
            let dir = if view.options.output_path.is_empty() {
                self.store.log_dir().to_path_buf()
            } else {
                std::path::PathBuf::from(&view.options.output_path)
            };
            dir.join(format!("{}_log.txt", view.job_name))
        });
        view.real_log_path = path.to_string_lossy().into_owned();
        if let Ok(meta) = std::fs::metadata(&path) {
            view.size = meta.len();
            if let Ok(modified) = meta.modified() {
                let datetime: DateTime<Utc> = modified.into();
                view.mod_time = datetime.format("%Y-%m-%d %H:%M:%S").to_string();
            }
        }
    }

    pub fn job_log_path(&self, uuid: &str) -> Option<std::path::PathBuf> {
        let job = self.find(uuid)?;
        let spec = job.spec.read();
        let dir = if spec.options.output_path.is_empty() {
            self.store.log_dir().to_path_buf()
        } else {
            std::path::PathBuf::from(&spec.options.output_path)
        };
        Some(dir.join(format!("{}_log.txt", spec.job_name)))
    }

    pub fn ring_buffer_for(&self, uuid: &str) -> Option<Arc<parking_lot::Mutex<rooster_logs::RingBuffer>>> {
        self.ring_registry.get(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rooster_core::{JobSpec, JobType, RunOptions};

    fn manager_in(dir: &std::path::Path) -> Manager<SystemClock> {
        let store = Arc::new(ConfigStore::at(dir.join("jobConfig.json"), dir.join("log")));
        Manager::new(SystemClock, store)
    }

    #[tokio::test]
    async fn save_without_uuid_assigns_one_and_lists_it() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let before = manager.list();

        let view = JobView::from_spec_and_observables(
            &JobSpec {
                uuid: String::new(),
                job_name: "new-job".into(),
                link: String::new(),
                job_type: JobType::Resident,
                run: false,
                bin_path: "true".into(),
                dir: String::new(),
                spec: String::new(),
                options: RunOptions::default(),
            },
            &Observables::default(),
        );
        let saved = manager.save(view).await.unwrap();
        assert!(!saved.uuid.is_empty());
        assert_eq!(manager.list().len(), before.len() + 1);

        manager.remove(&saved.uuid).await.unwrap();
        assert_eq!(manager.list().len(), before.len());
    }

    #[tokio::test]
    async fn remove_rejects_running_job() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let jobs = manager.list();
        let resident = jobs.iter().find(|j| j.run).unwrap();
        let result = manager.remove(&resident.uuid).await;
        assert!(matches!(result, Err(EngineError::Conflict(_))));
    }

    #[tokio::test]
    async fn stop_unknown_job_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let result = manager.stop("missing").await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
