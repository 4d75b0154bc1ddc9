// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Builds the [`tokio::process::Command`] a job runs under: resolves which
//! shell to invoke, enriches its environment the way an interactive login
//! shell would, and isolates the child tree so the supervisor can kill it
//! on stop — a fresh process group on unix, a hidden console on Windows.

mod env;
mod error;

pub use error::ShellError;

use std::path::Path;
use std::process::Stdio;

use rooster_core::JobSpec;
use tokio::process::Command;

/// Resolve the shell binary for a job: explicit `options.shellPath`, then
/// `$SHELL`, then a platform default (`zsh` on macOS, `cmd.exe` on
/// Windows via `%COMSPEC%`, `bash` elsewhere).
pub fn resolve_shell(job: &JobSpec) -> String {
    if !job.options.shell_path.is_empty() {
        return job.options.shell_path.clone();
    }
    if let Ok(shell) = std::env::var("SHELL") {
        if !shell.is_empty() {
            return shell;
        }
    }
    if cfg!(windows) {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else if cfg!(target_os = "macos") {
        "/bin/zsh".to_string()
    } else {
        "/bin/bash".to_string()
    }
}

/// Build the (not yet spawned) command for a job: login-shell invocation of
/// `job.bin_path` (`<shell> -lc <binPath>` on unix, `<shell> /C <binPath>`
/// on Windows), enriched `PATH`/`HOME`, working directory, stdin nulled,
/// and platform child-tree isolation — a fresh process group on unix so the
/// whole tree can be killed at once, a hidden console window on Windows so
/// a resident job doesn't flash a console on top of the dashboard.
pub async fn build_command(job: &JobSpec) -> Result<Command, ShellError> {
    let shell = resolve_shell(job);
    let env = env::load_login_env(&shell).await;

    tracing::info!(job = %job.display_name(), shell = %shell, command = %job.bin_path, "building command");

    let mut cmd = Command::new(&shell);
    if cfg!(windows) {
        cmd.arg("/C").arg(&job.bin_path);
    } else {
        cmd.arg("-lc").arg(&job.bin_path);
    }
    cmd.env_clear();
    cmd.envs(env);
    if !job.dir.is_empty() {
        cmd.current_dir(Path::new(&job.dir));
    }
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    Ok(cmd)
}

/// Send `SIGTERM` to a job's whole process group. On unix this targets
/// `-pid` (the group rooster put the child in at spawn time via
/// `process_group(0)`); on other platforms this is a single-process kill.
#[cfg(unix)]
pub fn terminate_group(pid: u32) -> Result<(), ShellError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(-(pid as i32));
    match signal::kill(group, Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(ShellError::Signal(err.to_string())),
    }
}

#[cfg(not(unix))]
pub fn terminate_group(_pid: u32) -> Result<(), ShellError> {
    // Best-effort: Windows has no equivalent to a process group signal here.
    // The supervisor falls back to dropping the child handle, which kills
    // only the immediate process, not descendants it may have spawned.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rooster_core::{JobType, RunOptions};

    fn job(bin_path: &str) -> JobSpec {
        JobSpec {
            uuid: "u1".into(),
            job_name: "demo".into(),
            link: String::new(),
            job_type: JobType::Resident,
            run: true,
            bin_path: bin_path.to_string(),
            dir: String::new(),
            spec: String::new(),
            options: RunOptions::default(),
        }
    }

    #[test]
    fn resolve_shell_prefers_explicit_option() {
        let mut j = job("echo hi");
        j.options.shell_path = "/bin/zsh".into();
        assert_eq!(resolve_shell(&j), "/bin/zsh");
    }

    #[tokio::test]
    async fn build_command_sets_login_args_and_dir() {
        let mut j = job("echo hi");
        if cfg!(windows) {
            j.options.shell_path = "cmd.exe".into();
        } else {
            j.options.shell_path = "/bin/sh".into();
        }
        j.dir = "/tmp".into();
        let cmd = build_command(&j).await.unwrap();
        let std_cmd = cmd.as_std();
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        let expected_flag = if cfg!(windows) { "/C" } else { "-lc" };
        assert_eq!(args, vec![expected_flag.to_string(), "echo hi".to_string()]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn resolve_shell_falls_back_to_comspec_on_windows() {
        if !cfg!(windows) {
            return;
        }
        let j = job("echo hi");
        let shell = resolve_shell(&j);
        assert!(!shell.is_empty());
    }
}
