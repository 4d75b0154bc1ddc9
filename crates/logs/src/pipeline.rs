// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-job asynchronous log writer: line-buffers arbitrary byte
//! chunks, timestamps each line, and fans them out to a rotating file
//! and/or an in-memory ring buffer.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ring::RingBuffer;
use crate::rotate::RotatingFile;
use crate::LogsError;

const CHANNEL_CAPACITY: usize = 100;

enum Chunk {
    Bytes(Vec<u8>),
    Close,
}

/// Handle given to a job's [`crate::Executor`] invocation. Cloning is cheap
/// and safe: every clone shares the same background worker.
#[derive(Clone)]
pub struct LogWriterHandle {
    sender: mpsc::Sender<Chunk>,
}

impl LogWriterHandle {
    /// Enqueue a chunk of raw child output. Backpressure is intentional:
    /// a full channel blocks the caller rather than dropping log data.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), LogsError> {
        self.sender.send(Chunk::Bytes(bytes.to_vec())).await.map_err(|_| LogsError::Closed)
    }

    /// Drain remaining queued chunks, then return. Writes after this call
    /// report [`LogsError::Closed`].
    pub async fn close(&self) {
        let _ = self.sender.send(Chunk::Close).await;
    }
}

struct Worker {
    receiver: mpsc::Receiver<Chunk>,
    partial_line: Vec<u8>,
    file: Option<RotatingFile>,
    ring: Option<Arc<Mutex<RingBuffer>>>,
    echo_std: bool,
}

impl Worker {
    async fn run(mut self) {
        while let Some(chunk) = self.receiver.recv().await {
            match chunk {
                Chunk::Bytes(bytes) => self.ingest(&bytes),
                Chunk::Close => break,
            }
        }
        // Drain anything still queued after a close was requested.
        while let Ok(chunk) = self.receiver.try_recv() {
            if let Chunk::Bytes(bytes) = chunk {
                self.ingest(&bytes);
            }
        }
    }

    fn ingest(&mut self, bytes: &[u8]) {
        self.partial_line.extend_from_slice(bytes);
        loop {
            let Some(pos) = self.partial_line.iter().position(|b| *b == b'\n') else { break };
            let line: Vec<u8> = self.partial_line.drain(..=pos).collect();
            self.emit_line(&line[..line.len() - 1]);
        }
    }

    fn emit_line(&mut self, line: &[u8]) {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let mut formatted = format!("{timestamp} ").into_bytes();
        formatted.extend_from_slice(line);
        formatted.push(b'\n');

        if self.echo_std {
            use std::io::Write;
            let _ = std::io::stdout().write_all(&formatted);
        }

        if let Some(file) = &mut self.file {
            if let Err(err) = file.write_line(&formatted) {
                tracing::warn!(error = %err, "failed to write job log line to file");
            }
        } else if let Some(ring) = &self.ring {
            ring.lock().push(&formatted);
        }
    }
}

/// Spawn a log writer. `file_path` enables the rotating-file target and
/// disables ring-buffer retention (matching the "file present ⇒ no memory
/// retention" rule); `ring` is used otherwise. `echo_std` additionally
/// mirrors every line to the daemon's own stdout, for `OutputType::Std`
/// jobs observed interactively.
pub fn spawn(
    file_path: Option<std::path::PathBuf>,
    ring: Option<Arc<Mutex<RingBuffer>>>,
    echo_std: bool,
) -> Result<LogWriterHandle, LogsError> {
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let file = file_path.map(RotatingFile::open).transpose()?;
    let ring = if file.is_some() { None } else { ring };
    let worker = Worker { receiver, partial_line: Vec::new(), file, ring, echo_std };
    tokio::spawn(worker.run());
    Ok(LogWriterHandle { sender })
}
