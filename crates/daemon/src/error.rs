// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-exports the shared [`rooster_core::EngineError`] as this crate's
//! result type; nothing daemon-specific needs its own error kind beyond
//! what [`crate::dispatcher::DispatcherError`] already covers for cron
//! parsing.

pub use rooster_core::{EngineError, EngineResult};
