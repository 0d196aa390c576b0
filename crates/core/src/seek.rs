// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seek request addressed by write command

use std::fmt;

/// Reposition request: the `write_cmd`-th oldest live entry, `write_cmd_offset`
/// bytes into it.
///
/// Field widths mirror the device control structure, so both fields are `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekTo {
    pub write_cmd: u32,
    pub write_cmd_offset: u32,
}

impl SeekTo {
    pub fn new(write_cmd: u32, write_cmd_offset: u32) -> Self {
        Self {
            write_cmd,
            write_cmd_offset,
        }
    }

    pub fn index(&self) -> usize {
        self.write_cmd as usize
    }

    pub fn offset(&self) -> usize {
        self.write_cmd_offset as usize
    }
}

impl fmt::Display for SeekTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.write_cmd, self.write_cmd_offset)
    }
}
