// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A rotating log file: rotates at 10 MiB, keeps up to 3 zstd-compressed
//! backups, and prunes backups older than 28 days.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const MAX_BACKUPS: u32 = 3;
const RETENTION: Duration = Duration::from_secs(28 * 24 * 60 * 60);

pub struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { path, file, size })
    }

    pub fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        self.size += line.len() as u64;
        if self.size >= ROTATE_AT_BYTES {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        for gen in (1..MAX_BACKUPS).rev() {
            let src = backup_path(&self.path, gen);
            let dst = backup_path(&self.path, gen + 1);
            if src.exists() {
                let _ = std::fs::rename(&src, &dst);
            }
        }
        let newest_backup = backup_path(&self.path, 1);
        compress_to(&self.path, &newest_backup)?;
        std::fs::write(&self.path, b"")?;

        prune_expired(&self.path)?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

fn backup_path(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{generation}.zst"));
    PathBuf::from(name)
}

fn compress_to(src: &Path, dst: &Path) -> std::io::Result<()> {
    let data = std::fs::read(src)?;
    let compressed = zstd::encode_all(&data[..], 3)?;
    std::fs::write(dst, compressed)
}

fn prune_expired(base: &Path) -> std::io::Result<()> {
    let now = SystemTime::now();
    for gen in 1..=MAX_BACKUPS {
        let path = backup_path(base, gen);
        let Ok(meta) = std::fs::metadata(&path) else { continue };
        let Ok(modified) = meta.modified() else { continue };
        if now.duration_since(modified).unwrap_or_default() > RETENTION {
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_line_accumulates_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_log.txt");
        let mut rf = RotatingFile::open(&path).unwrap();
        rf.write_line(b"hello\n").unwrap();
        assert_eq!(rf.size, 6);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn rotation_compresses_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_log.txt");
        let mut rf = RotatingFile::open(&path).unwrap();
        let chunk = vec![b'x'; 1024];
        let mut newline_chunk = chunk.clone();
        newline_chunk.push(b'\n');
        for _ in 0..(ROTATE_AT_BYTES / newline_chunk.len() as u64 + 2) {
            rf.write_line(&newline_chunk).unwrap();
        }
        assert!(backup_path(&path, 1).exists());
        assert!(std::fs::metadata(&path).unwrap().len() < ROTATE_AT_BYTES);
    }
}
