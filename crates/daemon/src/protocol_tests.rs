// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use tokio::io::AsyncWriteExt;
use yare::parameterized;

#[test]
fn plain_line_is_data() {
    assert_eq!(
        Message::parse(b"hello\n".to_vec()),
        Message::Data(b"hello\n".to_vec())
    );
}

#[test]
fn bare_terminator_is_data() {
    assert_eq!(Message::parse(b"\n".to_vec()), Message::Data(b"\n".to_vec()));
}

#[parameterized(
    first_entry = { "AESDCHAR_IOCSEEKTO:0,2\n", 0, 2 },
    later_entry = { "AESDCHAR_IOCSEEKTO:9,0\n", 9, 0 },
    leading_zeros = { "AESDCHAR_IOCSEEKTO:007,010\n", 7, 10 },
    max_u32 = { "AESDCHAR_IOCSEEKTO:4294967295,1\n", 4294967295, 1 },
)]
fn seek_command_parses(line: &str, write_cmd: u32, offset: u32) {
    assert_eq!(
        Message::parse(line.as_bytes().to_vec()),
        Message::Seek(SeekTo::new(write_cmd, offset))
    );
}

#[parameterized(
    letters = { "AESDCHAR_IOCSEEKTO:abc,2\n" },
    missing_comma = { "AESDCHAR_IOCSEEKTO:12\n" },
    empty_offset = { "AESDCHAR_IOCSEEKTO:1,\n" },
    negative = { "AESDCHAR_IOCSEEKTO:-1,2\n" },
    plus_sign = { "AESDCHAR_IOCSEEKTO:+1,2\n" },
    spaces = { "AESDCHAR_IOCSEEKTO: 1,2\n" },
    overflow = { "AESDCHAR_IOCSEEKTO:4294967296,0\n" },
    extra_field = { "AESDCHAR_IOCSEEKTO:1,2,3\n" },
    nothing = { "AESDCHAR_IOCSEEKTO:\n" },
)]
fn malformed_seek_is_flagged(line: &str) {
    assert!(matches!(
        Message::parse(line.as_bytes().to_vec()),
        Message::MalformedSeek(_)
    ));
}

#[test]
fn prefix_must_start_the_line() {
    let line = b"say AESDCHAR_IOCSEEKTO:0,1\n".to_vec();
    assert_eq!(Message::parse(line.clone()), Message::Data(line));
}

#[test]
fn malformed_seek_keeps_text_for_logging() {
    assert_eq!(
        Message::parse(b"AESDCHAR_IOCSEEKTO:abc,2\n".to_vec()),
        Message::MalformedSeek("abc,2".to_string())
    );
}

#[test]
fn seek_command_encoding_parses_back() {
    let line = seek_command(SeekTo::new(3, 17));
    assert_eq!(line, b"AESDCHAR_IOCSEEKTO:3,17\n");
    assert_eq!(Message::parse(line), Message::Seek(SeekTo::new(3, 17)));
}

#[tokio::test]
async fn read_message_returns_first_line() {
    let mut reader: &[u8] = b"hello\n";
    let mut buffer = Vec::new();

    let line = read_message(&mut reader, &mut buffer).await.unwrap();

    assert_eq!(line, Some(b"hello\n".to_vec()));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn read_message_discards_bytes_after_terminator() {
    let mut reader: &[u8] = b"first\nsecond\n";
    let mut buffer = Vec::new();

    let line = read_message(&mut reader, &mut buffer).await.unwrap();

    assert_eq!(line, Some(b"first\n".to_vec()));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn read_message_returns_none_on_close() {
    let mut reader: &[u8] = b"no terminator";
    let mut buffer = Vec::new();

    let line = read_message(&mut reader, &mut buffer).await.unwrap();

    assert_eq!(line, None);
    assert_eq!(buffer, b"no terminator");
}

#[tokio::test]
async fn read_message_grows_past_initial_buffer() {
    let mut payload = vec![b'x'; INITIAL_BUFFER_LEN * 5 + 17];
    payload.push(b'\n');
    let mut reader: &[u8] = &payload;
    let mut buffer = Vec::new();

    let line = read_message(&mut reader, &mut buffer).await.unwrap();

    assert_eq!(line, Some(payload.clone()));
}

#[tokio::test]
async fn read_message_assembles_split_writes() {
    let (mut client, mut server) = tokio::io::duplex(8);
    let writer = tokio::spawn(async move {
        for part in [&b"hel"[..], b"lo wor", b"ld\n"] {
            client.write_all(part).await.unwrap();
        }
        client
    });

    let mut buffer = Vec::new();
    let line = read_message(&mut server, &mut buffer).await.unwrap();

    assert_eq!(line, Some(b"hello world\n".to_vec()));
    drop(writer.await.unwrap());
}
