#![allow(clippy::expect_used)]

use hexsplicelib::{
    AutoFrontend, BackupPolicy, ByteBuffer, ByteStore, Direction, EditorConfig, EditorContext,
    EditorMode, EngineConfig, FixedStorage, HexSpliceError, HexSpliceErrorKind, Movement,
    SearchType, SpliceEngine, SpliceOp, StorageOp, StoreStrategy, StreamingStore, StringTable,
};
use proptest::prelude::*;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

const BUFFER_SIZE: usize = 7;

fn random_bytes(len: usize) -> Vec<u8> {
    rand::rng()
        .sample_iter(rand::distr::StandardUniform)
        .take(len)
        .collect()
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("Failed to write file");
    path
}

fn engine(dir: &Path) -> SpliceEngine {
    SpliceEngine {
        buffer_size: BUFFER_SIZE,
        scratch_path: dir.join("Hex-Editor").join("Temp.bin"),
    }
}

fn run_splice(dir: &Path, target: &Path, op: SpliceOp) -> Result<bool, HexSpliceError> {
    engine(dir).run(
        target,
        op,
        &mut AutoFrontend::accept(),
        &FixedStorage(u64::MAX),
        &StringTable::english(),
    )
}

fn context(dir: &Path, strategy: StoreStrategy) -> EditorContext<AutoFrontend, FixedStorage> {
    let editor = EditorConfig {
        backup: BackupPolicy::Never,
        backup_path: dir.join("backups"),
        ..EditorConfig::default()
    };
    let engine = EngineConfig {
        buffer_size: BUFFER_SIZE,
        max_window_len: 0x40,
        lines_per_page: 2,
        scratch_path: dir.join("Hex-Editor").join("Temp.bin"),
        strategy,
        ..EngineConfig::default()
    };
    EditorContext::new(editor, engine, AutoFrontend::accept(), FixedStorage(u64::MAX))
}

fn grid_sizes() -> [usize; 6] {
    [0, 1, BUFFER_SIZE - 1, BUFFER_SIZE, BUFFER_SIZE + 1, 3 * BUFFER_SIZE]
}

#[test]
fn test_insert_grid_matches_reference() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    for len in grid_sizes() {
        for offset in [0, len / 2, len] {
            for size in [0, 1, BUFFER_SIZE + 2] {
                // Arrange
                let original = random_bytes(len);
                let target = write_file(dir.path(), "insert.bin", &original);

                // Act
                let res = run_splice(dir.path(), &target, SpliceOp::Insert {
                    offset,
                    size,
                    fill: 0xA5,
                });

                // Assert
                let mut expected = original.clone();
                expected.splice(offset..offset, std::iter::repeat_n(0xA5, size));
                assert_eq!(res, Ok(true), "len {len} offset {offset} size {size}");
                assert_eq!(
                    fs::read(&target).ok(),
                    Some(expected),
                    "len {len} offset {offset} size {size}"
                );
            }
        }
    }
}

#[test]
fn test_remove_grid_matches_reference() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    for len in grid_sizes() {
        for offset in [0, len / 2, len] {
            for size in [0, 1, BUFFER_SIZE + 2, len - offset] {
                if offset + size > len {
                    continue;
                }
                // Arrange
                let original = random_bytes(len);
                let target = write_file(dir.path(), "remove.bin", &original);

                // Act
                let res = run_splice(dir.path(), &target, SpliceOp::Remove { offset, size });

                // Assert
                let mut expected = original.clone();
                expected.drain(offset..offset + size);
                assert_eq!(res, Ok(true), "len {len} offset {offset} size {size}");
                assert_eq!(
                    fs::read(&target).ok(),
                    Some(expected),
                    "len {len} offset {offset} size {size}"
                );
            }
        }
    }
}

#[test]
fn test_zero_sized_insert_then_remove_is_identity() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(2 * BUFFER_SIZE + 3);
    let target = write_file(dir.path(), "identity.bin", &original);

    for offset in 0..=original.len() {
        // Act
        let inserted = run_splice(dir.path(), &target, SpliceOp::Insert {
            offset,
            size: 0,
            fill: 0xFF,
        });
        let removed = run_splice(dir.path(), &target, SpliceOp::Remove { offset, size: 0 });

        // Assert
        assert_eq!(inserted, Ok(true));
        assert_eq!(removed, Ok(true));
        assert_eq!(fs::read(&target).ok().as_ref(), Some(&original));
    }
}

#[test]
fn test_insufficient_space_writes_nothing() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x20);
    let target = write_file(dir.path(), "full.bin", &original);
    let insert = SpliceOp::Insert {
        offset: 4,
        size: 8,
        fill: 0,
    };
    let remove = SpliceOp::Remove { offset: 4, size: 8 };

    // Act
    let insert_res = engine(dir.path()).run(
        &target,
        insert,
        &mut AutoFrontend::accept(),
        &FixedStorage(insert.required_space(0x20) - 1),
        &StringTable::english(),
    );
    let remove_res = engine(dir.path()).run(
        &target,
        remove,
        &mut AutoFrontend::accept(),
        &FixedStorage(remove.required_space(0x20) - 1),
        &StringTable::english(),
    );

    // Assert
    assert_eq!(
        insert_res,
        Err(HexSpliceError::SpliceError(HexSpliceErrorKind::InsufficientStorage {
            op: StorageOp::Insert,
            required: 2 * 0x20 + 8,
            available: 2 * 0x20 + 7,
        }))
    );
    assert_eq!(
        remove_res,
        Err(HexSpliceError::SpliceError(HexSpliceErrorKind::InsufficientStorage {
            op: StorageOp::Remove,
            required: 2 * 0x20 - 8,
            available: 2 * 0x20 - 9,
        }))
    );
    assert_eq!(fs::read(&target).ok(), Some(original));
    assert!(!dir.path().join("Hex-Editor").join("Temp.bin").exists());
}

#[test]
fn test_declined_splice_writes_nothing() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x10);
    let target = write_file(dir.path(), "declined.bin", &original);

    // Act
    let res = engine(dir.path()).run(
        &target,
        SpliceOp::Remove { offset: 0, size: 4 },
        &mut AutoFrontend::decline(),
        &FixedStorage(u64::MAX),
        &StringTable::english(),
    );

    // Assert
    assert_eq!(res, Ok(false));
    assert_eq!(fs::read(&target).ok(), Some(original));
}

#[test]
fn test_backup_without_space_aborts_commit() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x10);
    let target = write_file(dir.path(), "backup.bin", &original);
    let editor = EditorConfig {
        backup: BackupPolicy::Always,
        backup_path: dir.path().join("backups"),
        ..EditorConfig::default()
    };
    let engine = EngineConfig {
        strategy: StoreStrategy::Streaming,
        scratch_path: dir.path().join("Temp.bin"),
        ..EngineConfig::default()
    };
    let mut ctx = EditorContext::new(editor, engine, AutoFrontend::decline(), FixedStorage(0x1F));
    ctx.open(&target).expect("Failed to open file");
    ctx.script()
        .expect("No session")
        .inject_bytes(0, &[0xAA, 0xBB])
        .expect("Failed to write");

    // Act
    let res = ctx.commit_changes(true);

    // Assert
    assert_eq!(
        res,
        Err(HexSpliceError::EditError(HexSpliceErrorKind::InsufficientStorage {
            op: StorageOp::Backup,
            required: 0x20,
            available: 0x1F,
        }))
    );
    assert_eq!(ctx.pending_changes(), 2);
    assert_eq!(fs::read(&target).ok(), Some(original));
}

#[test]
fn test_refused_backup_is_not_offered_again() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x10);
    let target = write_file(dir.path(), "again.bin", &original);
    let editor = EditorConfig {
        backup: BackupPolicy::Always,
        backup_path: dir.path().join("backups"),
        ..EditorConfig::default()
    };
    let engine = EngineConfig {
        strategy: StoreStrategy::Streaming,
        scratch_path: dir.path().join("Temp.bin"),
        ..EngineConfig::default()
    };
    let mut ctx = EditorContext::new(editor, engine, AutoFrontend::decline(), FixedStorage(0x1F));
    ctx.open(&target).expect("Failed to open file");
    ctx.script()
        .expect("No session")
        .inject_bytes(0, &[0xAA, 0xBB])
        .expect("Failed to write");

    // Act
    let first = ctx.commit_changes(true);
    let second = ctx.commit_changes(true);

    // Assert
    assert!(first.is_err());
    assert_eq!(second, Ok(2));
    let mut expected = original;
    expected[..2].copy_from_slice(&[0xAA, 0xBB]);
    assert_eq!(fs::read(&target).ok(), Some(expected));
    assert!(!dir.path().join("backups").join("again.bin.bak").exists());
}

#[test]
fn test_change_map_commit_and_discard() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x40);
    let target = write_file(dir.path(), "commit.bin", &original);
    let offsets = [0x00, 0x07, 0x20, 0x3F];

    // Act
    let mut store = StreamingStore::open(&target, 0x10).expect("Failed to open file");
    for &offset in &offsets {
        store.put_byte(offset, !original[offset]).expect("Failed to write");
    }
    let discarded = store.write_changes(false);
    let after_discard = fs::read(&target).ok();

    for &offset in &offsets {
        store.put_byte(offset, !original[offset]).expect("Failed to write");
    }
    let written = store.write_changes(true);

    // Assert
    assert!(discarded.is_ok());
    assert_eq!(after_discard.as_ref(), Some(&original));
    assert_eq!(written, Ok(offsets.len()));
    assert!(store.changes().is_empty());

    let mut expected = original.clone();
    for &offset in &offsets {
        expected[offset] = !expected[offset];
    }
    assert_eq!(fs::read(&target).ok(), Some(expected));
}

#[test]
fn test_search_in_edit_window_matches_reference() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut data = random_bytes(0x100);
    for at in [0x21, 0x30, 0x5E, 0x90] {
        data[at..at + 2].copy_from_slice(&[0xC0, 0xDE]);
    }
    let target = write_file(dir.path(), "search.bin", &data);
    let mut ctx = context(dir.path(), StoreStrategy::Streaming);
    ctx.open(&target).expect("Failed to open file");
    ctx.jump_to(0x30).expect("Failed to jump");
    ctx.confirm_action().expect("Failed to enter edit mode");

    // Act
    let res = ctx.search(0, usize::MAX, &SearchType::Hex(vec![0xC0, 0xDE]));

    // Assert
    // Edit window is [0x20, 0x60)
    let expected: Vec<usize> = (0x20..0x5F)
        .filter(|&o| data[o..o + 2] == [0xC0, 0xDE])
        .collect();
    assert_eq!(res, Ok(expected));
}

#[test]
fn test_cursor_is_clamped_at_both_ends() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let target = write_file(dir.path(), "cursor.bin", &random_bytes(0x45));
    let mut ctx = context(dir.path(), StoreStrategy::InMemory);
    ctx.open(&target).expect("Failed to open file");

    // Act & Assert
    assert_eq!(ctx.move_left(), Ok(Movement::Blocked));
    assert_eq!(ctx.cursor_offset(), Ok(0));

    ctx.jump_to(0x44).expect("Failed to jump");
    for _ in 0..4 {
        assert_eq!(ctx.move_right(), Ok(Movement::Blocked));
    }
    assert_eq!(ctx.cursor_offset(), Ok(0x44));
    assert!(ctx.jump_to(0x45).is_err());
}

#[test]
fn test_change_mode_steps_without_wrapping() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let target = write_file(dir.path(), "change.bin", &[0xFF, 0x05]);
    let mut ctx = context(dir.path(), StoreStrategy::Streaming);
    ctx.open(&target).expect("Failed to open file");
    ctx.confirm_action().expect("Failed to enter edit mode");

    // Act
    let mode = ctx.confirm_action().expect("Failed to enter change mode");
    let up_at_max = ctx.change_byte(Direction::Up);
    let left_at_max = ctx.change_byte(Direction::Left);
    let moved = ctx.move_right();

    // Assert
    assert_eq!(mode, EditorMode::Change);
    assert_eq!(up_at_max, Ok(None));
    assert_eq!(left_at_max, Ok(Some(0xEF)));
    assert!(moved.is_err());
    assert_eq!(ctx.pending_changes(), 1);
}

#[test]
fn test_streamed_remove_through_context_reloads_session() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let original = random_bytes(0x30);
    let target = write_file(dir.path(), "session.bin", &original);
    let mut ctx = context(dir.path(), StoreStrategy::Streaming);
    ctx.open(&target).expect("Failed to open file");

    // Act
    let res = ctx.remove(0x08, 0x28);

    // Assert
    assert_eq!(res, Ok(true));
    assert_eq!(ctx.display_bytes(), Ok(original[..8].to_vec()));
    assert_eq!(ctx.cursor_offset(), Ok(7));
}

#[test]
fn test_assets_load_from_files() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let encoding = write_file(
        dir.path(),
        "encoding.json",
        br#"{ "map": { "41": "x", "42": "y" } }"#,
    );
    let labels = write_file(
        dir.path(),
        "labels.json",
        br#"{ "Header": { "ofs": "0x0", "size": 2 }, "Tail": { "ofs": "0x3", "size": 1 } }"#,
    );
    let target = write_file(dir.path(), "assets.bin", b"ABCD");
    let mut ctx = context(dir.path(), StoreStrategy::InMemory);
    ctx.open(&target).expect("Failed to open file");

    // Act
    let encoding_res = ctx.load_encoding(&encoding);
    let labels_res = ctx.load_labels(&labels);
    let jumped = ctx.jump_to_label("Tail");

    // Assert
    assert!(encoding_res.is_ok());
    assert!(labels_res.is_ok());
    assert!(jumped.is_ok());
    assert_eq!(ctx.cursor_offset(), Ok(3));
    assert_eq!(ctx.display_text(), Ok("xy..".to_string()));
    assert_eq!(
        ctx.search(0, 4, &SearchType::Encoded("y".into())),
        Ok(vec![1])
    );
}

proptest! {
    #[test]
    fn prop_typed_round_trip_u32(value: u32, offset in 0usize..12, big: bool) {
        let endian = hexsplicelib::Endianness::from_big(big);
        let mut buf = ByteBuffer::from_bytes("prop.bin", vec![0; 16]);

        prop_assert!(buf.write_typed(offset, value, endian));
        prop_assert_eq!(buf.read_typed::<u32>(offset, endian), value);
    }

    #[test]
    fn prop_typed_round_trip_u16(value: u16, offset in 0usize..14, big: bool) {
        let endian = hexsplicelib::Endianness::from_big(big);
        let mut buf = ByteBuffer::from_bytes("prop.bin", vec![0; 16]);

        prop_assert!(buf.write_typed(offset, value, endian));
        prop_assert_eq!(buf.read_typed::<u16>(offset, endian), value);
    }

    #[test]
    fn prop_bit_write_leaves_other_bits(byte: u8, idx in 0u8..8, set: bool) {
        let mut buf = ByteBuffer::from_bytes("prop.bin", vec![byte]);

        prop_assert!(buf.write_bit(0, idx, set).is_ok());
        prop_assert_eq!(buf.read_bit(0, idx), Ok(set));
        let after = buf.byte_at(0).unwrap_or_default();
        prop_assert_eq!(after & !(1 << idx), byte & !(1 << idx));
    }
}
