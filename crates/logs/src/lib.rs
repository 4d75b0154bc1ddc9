// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! rooster-logs: per-job log capture — ring buffer, rotating file,
//! asynchronous fan-out writer, and tail reads.

mod error;
mod pipeline;
mod registry;
mod ring;
mod rotate;

pub use error::LogsError;
pub use pipeline::{spawn, LogWriterHandle};
pub use registry::{tail, RingRegistry};
pub use ring::RingBuffer;
pub use rotate::RotatingFile;
