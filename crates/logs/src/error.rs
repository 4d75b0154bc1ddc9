// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogsError {
    #[error("log writer is closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
