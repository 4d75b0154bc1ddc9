// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A fixed-capacity byte ring buffer, used to retain recent log output in
//! memory for jobs that have no rotating-file target.

use std::collections::VecDeque;
use std::time::Instant;

pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// Overwrites its oldest bytes once full; never grows past `capacity`.
pub struct RingBuffer {
    capacity: usize,
    data: VecDeque<u8>,
    last_touch: Instant,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, data: VecDeque::with_capacity(capacity.min(4096)), last_touch: Instant::now() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.last_touch = Instant::now();
        if bytes.len() >= self.capacity {
            self.data.clear();
            self.data.extend(bytes[bytes.len() - self.capacity..].iter().copied());
            return;
        }
        let overflow = (self.data.len() + bytes.len()).saturating_sub(self.capacity);
        for _ in 0..overflow {
            self.data.pop_front();
        }
        self.data.extend(bytes.iter().copied());
    }

    pub fn last_touch(&self) -> Instant {
        self.last_touch
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer, oldest byte first.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// The last `n` bytes, or the whole buffer if shorter.
    pub fn tail_bytes(&self, n: usize) -> Vec<u8> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).copied().collect()
    }

    /// The last `n` newline-terminated lines, decoded lossily.
    pub fn tail_lines(&self, n: usize) -> String {
        let text = String::from_utf8_lossy(&self.snapshot()).into_owned();
        tail_lines_of(&text, n)
    }
}

pub fn tail_lines_of(text: &str, n: usize) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.len() > n {
        lines = lines.split_off(lines.len() - n);
    }
    lines.join("\n")
}
