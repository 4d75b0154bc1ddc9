// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to signal process group: {0}")]
    Signal(String),
}
