// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn create_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    std::fs::write(&path, b"stale contents\n").unwrap();

    let backend = FileBackend::create(&path, capacity(4)).unwrap();

    assert_eq!(backend.len(), 0);
    assert_eq!(std::fs::read(&path).unwrap(), b"");
}

#[test]
fn create_makes_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/state/ringlog.data");

    let backend = FileBackend::create(&path, capacity(4)).unwrap();

    assert!(path.exists());
    assert_eq!(backend.path(), path.as_path());
}

#[test]
fn appends_are_mirrored_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(4)).unwrap();

    backend.append(Entry::from("hello\n")).unwrap();
    backend.append(Entry::from("world\n")).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"hello\nworld\n");
}

#[test]
fn eviction_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(2)).unwrap();

    backend.append(Entry::from("hello\n")).unwrap();
    backend.append(Entry::from("world\n")).unwrap();
    let evicted = backend.append(Entry::from("again\n")).unwrap();

    assert_eq!(evicted, Some(Entry::from("hello\n")));
    assert_eq!(std::fs::read(&path).unwrap(), b"world\nagain\n");
}

#[test]
fn reads_come_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(2)).unwrap();
    backend.append(Entry::from("hello\n")).unwrap();
    backend.append(Entry::from("world\n")).unwrap();
    backend.append(Entry::from("again\n")).unwrap();

    let mut buf = [0u8; 64];
    let n = backend.read_at(2, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"rld\n");
    let n = backend.read_at(6, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"again\n");
    assert_eq!(backend.read_at(12, &mut buf).unwrap(), 0);
}

#[test]
fn seek_translation_matches_memory_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(3)).unwrap();
    for line in ["a\n", "bb\n", "ccc\n"] {
        backend.append(Entry::from(line)).unwrap();
    }

    assert_eq!(backend.offset_for(SeekTo::new(2, 1)), Ok(6));
    assert!(backend.offset_for(SeekTo::new(3, 0)).is_err());
    assert_eq!(
        backend.locate(6),
        Some(Position {
            index: 2,
            offset: 1
        })
    );
}

#[test]
fn close_removes_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(2)).unwrap();
    backend.append(Entry::from("x\n")).unwrap();

    backend.close().unwrap();
    assert!(!path.exists());
    backend.close().unwrap();
}

#[test]
fn failed_append_is_not_committed() {
    let mut backend = FileBackend::create(Path::new("/dev/full"), capacity(2)).unwrap();

    assert!(backend.append(Entry::from("hello\n")).is_err());

    assert_eq!(backend.len(), 0);
    assert_eq!(backend.total_len(), 0);
    let mut buf = [0u8; 8];
    assert_eq!(backend.read_at(0, &mut buf).unwrap(), 0);
}

fn full_device() -> File {
    OpenOptions::new().write(true).open("/dev/full").unwrap()
}

#[test]
fn failed_eviction_keeps_previous_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(2)).unwrap();
    backend.append(Entry::from("hello\n")).unwrap();
    backend.append(Entry::from("world\n")).unwrap();

    let data_file = std::mem::replace(&mut backend.file, full_device());
    assert!(backend.append(Entry::from("again\n")).is_err());
    backend.file = data_file;

    assert_eq!(backend.len(), 2);
    assert_eq!(backend.offset_for(SeekTo::new(1, 0)).unwrap(), 6);
    let mut buf = [0u8; 16];
    let n = backend.read_at(6, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"world\n");
}

#[test]
fn next_append_after_failure_resyncs_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ringlog.data");
    let mut backend = FileBackend::create(&path, capacity(3)).unwrap();
    backend.append(Entry::from("hello\n")).unwrap();

    let data_file = std::mem::replace(&mut backend.file, full_device());
    assert!(backend.append(Entry::from("lost\n")).is_err());
    backend.file = data_file;
    assert!(backend.stale);

    // Reads are still correct while the file is out of sync
    let mut buf = [0u8; 16];
    let n = backend.read_at(0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello\n");

    backend.append(Entry::from("world\n")).unwrap();
    assert!(!backend.stale);
    assert_eq!(std::fs::read(&path).unwrap(), b"hello\nworld\n");
}

mod proptests {
    use super::*;
    use crate::backend::MemoryBackend;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn file_and_memory_backends_agree(
            cap in 1usize..6,
            lines in proptest::collection::vec("[a-z]{0,8}", 0..16)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let mut file = FileBackend::create(&dir.path().join("ringlog.data"), capacity(cap)).unwrap();
            let mut memory = MemoryBackend::new(capacity(cap));

            for line in &lines {
                let bytes = format!("{line}\n").into_bytes();
                let from_file = file.append(Entry::new(bytes.clone())).unwrap();
                let from_memory = memory.append(Entry::new(bytes)).unwrap();
                prop_assert_eq!(from_file, from_memory);
            }

            prop_assert_eq!(file.total_len(), memory.total_len());
            let mut offset = 0;
            loop {
                let mut a = [0u8; 5];
                let mut b = [0u8; 5];
                let n = file.read_at(offset, &mut a).unwrap();
                prop_assert_eq!(n, memory.read_at(offset, &mut b).unwrap());
                prop_assert_eq!(&a[..n], &b[..n]);
                if n == 0 {
                    break;
                }
                offset += n;
            }
            prop_assert_eq!(offset, memory.total_len());
        }
    }
}
