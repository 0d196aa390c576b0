// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line protocol spoken over TCP
//!
//! A message is any run of bytes ending in `\n`. A message of the form
//! `AESDCHAR_IOCSEEKTO:<write_cmd>,<offset>\n` repositions the session's
//! read cursor; anything else is appended to the history verbatim.

use std::collections::TryReserveError;

use ringlog_core::SeekTo;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Prefix identifying a seek command
pub const SEEK_COMMAND_PREFIX: &[u8] = b"AESDCHAR_IOCSEEKTO:";

pub const LINE_TERMINATOR: u8 = b'\n';

/// Starting size of the per-connection accumulation buffer
pub const INITIAL_BUFFER_LEN: usize = 1024;

/// Default size of one playback write
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default listen port
pub const DEFAULT_PORT: u16 = 9000;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not grow message buffer: {0}")]
    BufferExhausted(#[from] TryReserveError),
}

/// One complete message received from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Bytes to append, terminator included
    Data(Vec<u8>),
    /// Reposition the read cursor
    Seek(SeekTo),
    /// Seek prefix followed by fields that do not parse
    MalformedSeek(String),
}

impl Message {
    /// Classify a complete line (terminator included)
    pub fn parse(line: Vec<u8>) -> Self {
        let Some(args) = line.strip_prefix(SEEK_COMMAND_PREFIX) else {
            return Message::Data(line);
        };
        let args = args.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(args);

        match parse_seek_args(args) {
            Some(seek) => Message::Seek(seek),
            None => Message::MalformedSeek(String::from_utf8_lossy(args).into_owned()),
        }
    }
}

/// Encode a seek command line
pub fn seek_command(seek: SeekTo) -> Vec<u8> {
    let mut line = SEEK_COMMAND_PREFIX.to_vec();
    line.extend_from_slice(seek.to_string().as_bytes());
    line.push(LINE_TERMINATOR);
    line
}

/// Parse `<write_cmd>,<offset>` as two unsigned decimal integers
fn parse_seek_args(args: &[u8]) -> Option<SeekTo> {
    let args = std::str::from_utf8(args).ok()?;
    let (write_cmd, offset) = args.split_once(',')?;
    Some(SeekTo::new(parse_decimal(write_cmd)?, parse_decimal(offset)?))
}

fn parse_decimal(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Read until the accumulated bytes contain a terminator.
///
/// Returns the first line (terminator included) and clears `buffer`; any
/// bytes after the terminator are discarded. Returns `None` when the peer
/// closes first. The buffer doubles whenever it fills.
///
/// Bytes read so far stay in `buffer`, so the future may be dropped and the
/// read resumed later without losing data.
pub async fn read_message<R>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut scanned = 0;
    loop {
        if let Some(pos) = buffer[scanned..]
            .iter()
            .position(|b| *b == LINE_TERMINATOR)
        {
            let end = scanned + pos + 1;
            let line = buffer[..end].to_vec();
            buffer.clear();
            return Ok(Some(line));
        }
        scanned = buffer.len();

        if buffer.len() == buffer.capacity() {
            let grow = buffer.capacity().max(INITIAL_BUFFER_LEN);
            buffer.try_reserve_exact(grow)?;
        }

        if reader.read_buf(buffer).await? == 0 {
            return Ok(None);
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
