// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment enrichment: merges a baseline set of system paths into
//! `PATH` and, on unix, sources the shell's rc files so jobs see the same
//! environment a login shell would (nvm, rbenv, homebrew, etc). Windows has
//! no rc-file equivalent, so there enrichment is PATH-only.

use std::collections::HashMap;
use std::path::Path;

/// Directories every job's `PATH` should contain, appended after whatever
/// the process already has (deduplicated, order-preserving).
#[cfg(unix)]
const BASELINE_PATH: &[&str] =
    &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin", "/bin", "/usr/sbin", "/sbin"];

#[cfg(windows)]
const BASELINE_PATH: &[&str] = &[r"C:\Windows\System32", r"C:\Windows", r"C:\Windows\System32\Wbem"];

/// Git-for-Windows installs its own `bin`/`cmd` directories outside `PATH`
/// by default; add them when the install is actually present so jobs that
/// shell out to `git`, `bash`, etc. from a plain `cmd.exe` job still work.
#[cfg(windows)]
fn git_for_windows_entries() -> Vec<String> {
    [r"C:\Program Files\Git\cmd", r"C:\Program Files\Git\bin", r"C:\Program Files (x86)\Git\cmd"]
        .iter()
        .filter(|p| Path::new(p).is_dir())
        .map(|p| p.to_string())
        .collect()
}

/// `PATH`'s entry separator — `:` on unix, `;` on Windows.
#[cfg(unix)]
const PATH_SEP: char = ':';
#[cfg(windows)]
const PATH_SEP: char = ';';

fn merge_path(existing: &str, extra_sources: &[String]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut parts = Vec::new();
    for entry in existing.split(PATH_SEP).map(str::trim).filter(|s| !s.is_empty()) {
        if seen.insert(entry.to_string()) {
            parts.push(entry.to_string());
        }
    }
    for entry in extra_sources.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if seen.insert(entry.to_string()) {
            parts.push(entry.to_string());
        }
    }
    for entry in BASELINE_PATH {
        if seen.insert(entry.to_string()) {
            parts.push(entry.to_string());
        }
    }
    parts.join(&PATH_SEP.to_string())
}

#[cfg(unix)]
fn lines_of(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| content.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

/// `/etc/paths` plus every file under `/etc/paths.d/`, macOS's
/// `path_helper` inputs.
#[cfg(unix)]
fn etc_paths_entries() -> Vec<String> {
    let mut entries = lines_of(Path::new("/etc/paths"));
    if let Ok(dir) = std::fs::read_dir("/etc/paths.d") {
        let mut files: Vec<_> = dir.flatten().map(|e| e.path()).filter(|p| p.is_file()).collect();
        files.sort();
        for file in files {
            entries.extend(lines_of(&file));
        }
    }
    entries
}

/// Extra `PATH` entries to fold in beyond [`BASELINE_PATH`]: macOS's
/// `/etc/paths` inputs on unix, a present-or-absent Git-for-Windows
/// install on Windows.
#[cfg(unix)]
fn platform_extra_path_entries() -> Vec<String> {
    etc_paths_entries()
}

#[cfg(windows)]
fn platform_extra_path_entries() -> Vec<String> {
    git_for_windows_entries()
}

/// The process environment with `HOME` filled in (from `$HOME` or the
/// current user) and `PATH` enriched with platform baseline directories.
/// This is the environment used to run the rc-sourcing probe itself.
fn enriched_process_env() -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    if env.get("HOME").map(String::is_empty).unwrap_or(true) {
        if let Some(home) = dirs::home_dir() {
            env.insert("HOME".to_string(), home.to_string_lossy().to_string());
        }
    }
    let existing_path = env.get("PATH").cloned().unwrap_or_default();
    let merged = merge_path(&existing_path, &platform_extra_path_entries());
    env.insert("PATH".to_string(), merged);
    env
}

/// Run `shell -lc '<rc files>; env -0'` and parse the resulting environment,
/// falling back to [`enriched_process_env`] if the probe fails. Mirrors
/// sourcing `~/.zshenv`/`~/.zprofile`/`~/.zshrc` for zsh, or
/// `~/.bash_profile`/`~/.profile`/`~/.bashrc` for everything else.
#[cfg(unix)]
pub async fn load_login_env(shell: &str) -> HashMap<String, String> {
    let base = enriched_process_env();
    let script = if shell.contains("zsh") {
        "[ -f ~/.zshenv ] && source ~/.zshenv; [ -f ~/.zprofile ] && source ~/.zprofile; [ -f ~/.zshrc ] && source ~/.zshrc; env -0"
    } else {
        "[ -f ~/.bash_profile ] && source ~/.bash_profile; [ -f ~/.profile ] && source ~/.profile; [ -f ~/.bashrc ] && source ~/.bashrc; env -0"
    };

    let output = tokio::process::Command::new(shell)
        .arg("-lc")
        .arg(script)
        .env_clear()
        .envs(&base)
        .output()
        .await;

    let Ok(output) = output else {
        return base;
    };
    if !output.status.success() || output.stdout.is_empty() {
        return base;
    }

    let mut env = HashMap::new();
    for entry in output.stdout.split(|b| *b == 0) {
        if entry.is_empty() {
            continue;
        }
        let Ok(text) = std::str::from_utf8(entry) else { continue };
        if let Some((key, value)) = text.split_once('=') {
            env.insert(key.to_string(), value.to_string());
        }
    }
    if env.is_empty() {
        return base;
    }

    let existing_path = env.get("PATH").cloned().unwrap_or_default();
    env.insert("PATH".to_string(), merge_path(&existing_path, &[]));
    env
}

/// Windows has no universal rc-file equivalent to source, so enrichment
/// here is the baseline-PATH merge only; `shell` is unused but kept in the
/// signature so callers don't need a platform-specific call site.
#[cfg(windows)]
pub async fn load_login_env(_shell: &str) -> HashMap<String, String> {
    enriched_process_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn merge_path_deduplicates_and_appends_baseline() {
        let merged = merge_path("/usr/bin:/opt/custom", &["/opt/custom".to_string()]);
        assert_eq!(merged, "/usr/bin:/opt/custom:/usr/local/bin:/opt/homebrew/bin:/bin:/usr/sbin:/sbin");
    }

    #[test]
    fn merge_path_handles_empty_existing() {
        let merged = merge_path("", &[]);
        assert_eq!(merged, BASELINE_PATH.join(&PATH_SEP.to_string()));
    }

    #[cfg(windows)]
    #[test]
    fn merge_path_uses_semicolon_separator_on_windows() {
        let merged = merge_path(r"C:\custom", &[]);
        assert!(merged.starts_with(r"C:\custom;"));
    }

    #[tokio::test]
    async fn load_login_env_falls_back_when_shell_missing() {
        let env = load_login_env("/no/such/shell").await;
        assert!(env.contains_key("PATH"));
    }
}
