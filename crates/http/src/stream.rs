// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one endpoint excluded from the request timeout: a Server-Sent
//! Events feed of a job's log, resumable by byte offset via
//! `Last-Event-ID`.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use futures_util::stream::Stream;
use rooster_core::Clock;
use rooster_wire::JobLogQuery;

use crate::AppState;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PING_INTERVAL: Duration = Duration::from_secs(3);

struct TailState {
    path: Option<std::path::PathBuf>,
    ring: Option<std::sync::Arc<parking_lot::Mutex<rooster_logs::RingBuffer>>>,
    offset: usize,
    last_event: tokio::time::Instant,
}

/// `GET /job-log-stream?jobId=...`, `Last-Event-ID: <byte offset>`. Emits a
/// `message` event with `id = <new byte offset>` whenever the job's log
/// grows, and a `ping` event every [`PING_INTERVAL`] of silence.
pub async fn job_log_stream<C: Clock>(
    State(state): State<AppState<C>>,
    Query(query): Query<JobLogQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let path = state.manager.job_log_path(&query.job_id);
    let ring = state.manager.ring_buffer_for(&query.job_id);

    let resume_offset: Option<usize> =
        headers.get("last-event-id").and_then(|v| v.to_str().ok()).and_then(|s| s.parse().ok());

    let current_len = current_length(path.as_deref(), ring.as_ref());
    let offset = resume_offset.unwrap_or(current_len);

    let initial = TailState { path, ring, offset, last_event: tokio::time::Instant::now() };

    let stream = futures_util::stream::unfold(initial, |mut tail| async move {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let len = current_length(tail.path.as_deref(), tail.ring.as_ref());

            if len > tail.offset {
                let chunk = read_range(tail.path.as_deref(), tail.ring.as_ref(), tail.offset, len);
                tail.offset = len;
                tail.last_event = tokio::time::Instant::now();
                let event = Event::default().id(tail.offset.to_string()).data(chunk);
                return Some((Ok(event), tail));
            }

            if len < tail.offset {
                // The ring buffer wrapped or the file was rotated/truncated
                // underneath us; resynchronize to the new end.
                tail.offset = len;
            }

            if tail.last_event.elapsed() >= PING_INTERVAL {
                tail.last_event = tokio::time::Instant::now();
                let event = Event::default().event("ping").data("");
                return Some((Ok(event), tail));
            }
        }
    });

    Sse::new(stream)
}

fn current_length(
    path: Option<&std::path::Path>,
    ring: Option<&std::sync::Arc<parking_lot::Mutex<rooster_logs::RingBuffer>>>,
) -> usize {
    if let Some(path) = path.filter(|p| p.exists()) {
        std::fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0)
    } else if let Some(ring) = ring {
        ring.lock().len()
    } else {
        0
    }
}

fn read_range(
    path: Option<&std::path::Path>,
    ring: Option<&std::sync::Arc<parking_lot::Mutex<rooster_logs::RingBuffer>>>,
    start: usize,
    end: usize,
) -> String {
    let raw = if let Some(path) = path.filter(|p| p.exists()) {
        std::fs::read(path).unwrap_or_default()
    } else if let Some(ring) = ring {
        ring.lock().snapshot()
    } else {
        Vec::new()
    };
    let start = start.min(raw.len());
    let end = end.min(raw.len());
    String::from_utf8_lossy(&raw[start..end]).into_owned()
}
