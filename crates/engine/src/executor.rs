// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single execution unit: build a command, spawn it, pump its output
//! into the log pipeline, wait for it to exit (or be cancelled), and
//! report what happened.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use rooster_core::{Clock, ExecutionResult, JobSpec, OutputType};
use rooster_logs::RingRegistry;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

const GRACEFUL_WAIT_DELAY: Duration = Duration::from_secs(1);

fn resolve_log_path(job: &JobSpec) -> PathBuf {
    let dir = if job.options.output_path.is_empty() {
        rooster_storage::default_log_dir()
    } else {
        PathBuf::from(&job.options.output_path)
    };
    dir.join(format!("{}_log.txt", job.job_name))
}

/// Execute one run of `job` to completion. `on_start` is invoked once the
/// child's pid is known; the caller (resident supervisor or scheduled
/// dispatcher) uses it to record the pid and flip the job to `Running`.
pub async fn execute<C: Clock>(
    clock: &C,
    cancel: CancellationToken,
    job: &JobSpec,
    ring_registry: &RingRegistry,
    on_start: impl FnOnce(u32) + Send + 'static,
) -> ExecutionResult {
    let start_time = clock.now_utc();
    let start_instant = clock.now();

    let log_path = resolve_log_path(job);
    let (file_target, ring_target, echo_std) = match job.options.output_type {
        OutputType::File => (Some(log_path), None, false),
        OutputType::Std => (None, Some(ring_registry.get_or_create(&job.uuid)), true),
    };

    let log_writer = match rooster_logs::spawn(file_target, ring_target, echo_std) {
        Ok(writer) => Some(writer),
        Err(err) => {
            tracing::warn!(job = %job.display_name(), error = %err, "failed to open log writer, continuing without capture");
            None
        }
    };

    let mut command = match rooster_shell::build_command(job).await {
        Ok(cmd) => cmd,
        Err(err) => {
            return finish_spawn_failure(clock, start_time, start_instant, format!("{err}"));
        }
    };
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    tracing::info!(job = %job.display_name(), "spawning");
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(job = %job.display_name(), error = %err, "spawn failed");
            return finish_spawn_failure(clock, start_time, start_instant, err.to_string());
        }
    };

    if let Some(pid) = child.id() {
        on_start(pid);
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    if let Some(writer) = log_writer.clone() {
        if let Some(stdout) = stdout {
            tokio::spawn(pump(stdout, writer.clone()));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(pump(stderr, writer));
        }
    }

    let pid = child.id();
    let exit_code = tokio::select! {
        status = child.wait() => exit_code_of(status),
        _ = cancel.cancelled() => {
            graceful_kill(&mut child, pid).await
        }
    };

    if let Some(writer) = log_writer {
        writer.close().await;
    }

    let end_time = clock.now_utc();
    let duration = clock.now().duration_since(start_instant);
    ExecutionResult { start_time, end_time, duration, exit_code, error: None }
}

fn finish_spawn_failure<C: Clock>(
    clock: &C,
    start_time: chrono::DateTime<chrono::Utc>,
    start_instant: std::time::Instant,
    error: String,
) -> ExecutionResult {
    let end_time = clock.now_utc();
    let duration = clock.now().duration_since(start_instant);
    ExecutionResult { start_time, end_time, duration, exit_code: -1, error: Some(error) }
}

fn exit_code_of(status: std::io::Result<std::process::ExitStatus>) -> i32 {
    match status {
        Ok(status) => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                status.code().or_else(|| status.signal().map(|s| 128 + s)).unwrap_or(-1)
            }
            #[cfg(not(unix))]
            {
                status.code().unwrap_or(-1)
            }
        }
        Err(_) => -1,
    }
}

async fn graceful_kill(child: &mut tokio::process::Child, pid: Option<u32>) -> i32 {
    if let Some(pid) = pid {
        if let Err(err) = rooster_shell::terminate_group(pid) {
            tracing::warn!(pid, error = %err, "failed to send SIGTERM to process group");
        }
    }
    match tokio::time::timeout(GRACEFUL_WAIT_DELAY, child.wait()).await {
        Ok(status) => exit_code_of(status),
        Err(_) => {
            let _ = child.kill().await;
            exit_code_of(child.wait().await)
        }
    }
}

async fn pump(mut reader: impl tokio::io::AsyncRead + Unpin, writer: rooster_logs::LogWriterHandle) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if writer.write(&buf[..n]).await.is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}
