// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier generation.

use uuid::Uuid;

/// Generates a fresh job identifier.
///
/// Persisted jobs get their `uuid` assigned on first sight (see
/// `JobConfig::add_job`); this is the sole place new ids are minted.
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}
