//! Chunked file copies: the pre-write backup and save-as.

use crate::config::{BackupPolicy, EditorConfig};
use crate::error::{HexSpliceError, HexSpliceErrorKind, StorageOp};
use crate::host::{Frontend, StorageProbe};
use crate::strings::{StringTable, keys};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Copies `src` to `dst` in chunks of `buffer_size`, reporting the bytes left
/// under `progress_key` after every chunk. Returns the number of bytes copied.
///
/// # Errors
/// Returns any I/O error of either file.
pub fn copy_chunked<F>(
    src: &Path,
    dst: &Path,
    buffer_size: usize,
    frontend: &mut F,
    strings: &StringTable,
    progress_key: &str,
) -> io::Result<u64>
where
    F: Frontend + ?Sized,
{
    let mut input = File::open(src)?;
    let total = input.metadata()?.len();
    let mut output = File::create(dst)?;

    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n])?;
        copied += n as u64;

        let left = usize::try_from(total.saturating_sub(copied)).unwrap_or(usize::MAX);
        frontend.show_progress(&strings.with_counter(progress_key, left));
    }

    output.sync_all()?;
    Ok(copied)
}

/// Destination of the backup of `file` inside `backup_dir`.
#[must_use]
pub fn backup_path_for(file: &Path, backup_dir: &Path) -> PathBuf {
    let mut name = file
        .file_name()
        .map_or_else(|| "backup".into(), ToOwned::to_owned);
    name.push(".bak");
    backup_dir.join(name)
}

/// Runs the backup flow for `file` according to `config.backup`.
///
/// Returns the backup path when a copy was made and `None` when the policy or the
/// user skipped it. When there is not enough room for a backup the user may choose
/// to continue without one.
///
/// # Errors
/// - Returns `InsufficientStorage` if space is short and the user does not continue.
/// - Returns an I/O error if the copy fails.
pub fn backup_file<F, S>(
    file: &Path,
    config: &EditorConfig,
    buffer_size: usize,
    frontend: &mut F,
    probe: &S,
    strings: &StringTable,
) -> Result<Option<PathBuf>, HexSpliceError>
where
    F: Frontend + ?Sized,
    S: StorageProbe + ?Sized,
{
    let err = |kind: HexSpliceErrorKind| HexSpliceError::EditError(kind);

    match config.backup {
        BackupPolicy::Never => return Ok(None),
        BackupPolicy::Ask if !frontend.confirm(&strings.lookup(keys::CREATE_BACKUP)) => {
            return Ok(None);
        }
        BackupPolicy::Always | BackupPolicy::Ask => {}
    }

    let size = fs::metadata(file)
        .map_err(|e| err(HexSpliceErrorKind::from_io(&e, file)))?
        .len();
    fs::create_dir_all(&config.backup_path).map_err(|e| err(e.into()))?;

    let required = size.saturating_mul(2);
    let available = probe
        .free_space(&config.backup_path)
        .map_err(|e| err(e.into()))?;
    if available < required {
        if frontend.confirm(&strings.lookup(keys::NOT_ENOUGH_SPACE_BACKUP)) {
            return Ok(None);
        }
        return Err(err(HexSpliceErrorKind::InsufficientStorage {
            op: StorageOp::Backup,
            required,
            available,
        }));
    }

    let dst = backup_path_for(file, &config.backup_path);
    copy_chunked(file, &dst, buffer_size, frontend, strings, keys::BACKING_UP_FILE)
        .map_err(|e| err(e.into()))?;
    info!("backed up {} to {}", file.display(), dst.display());
    Ok(Some(dst))
}

/// Checks that the directory of `dst` has room for a save of `size` bytes
/// (twice the size), telling the user when it does not.
///
/// # Errors
/// Returns `InsufficientStorage` if free space is below twice `size`, or an I/O
/// error if the storage cannot be queried.
pub fn check_save_space<F, S>(
    dst: &Path,
    size: u64,
    frontend: &mut F,
    probe: &S,
    strings: &StringTable,
) -> Result<(), HexSpliceError>
where
    F: Frontend + ?Sized,
    S: StorageProbe + ?Sized,
{
    let dst_dir = match dst.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let required = size.saturating_mul(2);
    let available = probe
        .free_space(dst_dir)
        .map_err(|e| HexSpliceError::EditError(e.into()))?;
    if available < required {
        frontend.status(&strings.lookup(keys::NOT_ENOUGH_SPACE_SAVE));
        return Err(HexSpliceError::EditError(
            HexSpliceErrorKind::InsufficientStorage {
                op: StorageOp::Save,
                required,
                available,
            },
        ));
    }
    Ok(())
}

/// Copies `src` to `dst` after checking there is room for it.
///
/// # Errors
/// - Returns `InsufficientStorage` if free space is below twice the file size.
/// - Returns an I/O error if the copy fails.
pub fn save_as<F, S>(
    src: &Path,
    dst: &Path,
    buffer_size: usize,
    frontend: &mut F,
    probe: &S,
    strings: &StringTable,
) -> Result<(), HexSpliceError>
where
    F: Frontend + ?Sized,
    S: StorageProbe + ?Sized,
{
    let err = |kind: HexSpliceErrorKind| HexSpliceError::EditError(kind);

    let size = fs::metadata(src)
        .map_err(|e| err(HexSpliceErrorKind::from_io(&e, src)))?
        .len();
    check_save_space(dst, size, frontend, probe, strings)?;

    copy_chunked(src, dst, buffer_size, frontend, strings, keys::SAVING_FILE)
        .map_err(|e| err(e.into()))?;
    info!("saved {} as {}", src.display(), dst.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::host::{AutoFrontend, FixedStorage};

    fn setup(bytes: &[u8]) -> (tempfile::TempDir, PathBuf, EditorConfig) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("game.sav");
        std::fs::write(&file, bytes).expect("Failed to write file");
        let config = EditorConfig {
            backup: BackupPolicy::Always,
            backup_path: dir.path().join("Backups"),
            ..EditorConfig::default()
        };
        (dir, file, config)
    }

    #[test]
    fn test_backup_always_copies_file() {
        // Arrange
        let (_dir, file, config) = setup(&[1, 2, 3, 4, 5]);

        // Act
        let res = backup_file(
            &file,
            &config,
            2,
            &mut AutoFrontend::accept(),
            &FixedStorage(u64::MAX),
            &StringTable::english(),
        );

        // Assert
        let dst = res.ok().flatten().expect("Backup was not created");
        assert_eq!(dst.file_name().and_then(|n| n.to_str()), Some("game.sav.bak"));
        assert_eq!(std::fs::read(dst).ok(), Some(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_backup_ask_declined_skips_copy() {
        // Arrange
        let (_dir, file, mut config) = setup(&[1]);
        config.backup = BackupPolicy::Ask;

        // Act
        let res = backup_file(
            &file,
            &config,
            2,
            &mut AutoFrontend::decline(),
            &FixedStorage(u64::MAX),
            &StringTable::english(),
        );

        // Assert
        assert_eq!(res, Ok(None));
        assert!(!config.backup_path.exists());
    }

    #[test]
    fn test_backup_without_space_aborts_when_declined() {
        // Arrange
        let (_dir, file, config) = setup(&[0; 8]);

        // Act
        let res = backup_file(
            &file,
            &config,
            2,
            &mut AutoFrontend::decline(),
            &FixedStorage(15),
            &StringTable::english(),
        );

        // Assert
        assert_eq!(
            res,
            Err(HexSpliceError::EditError(HexSpliceErrorKind::InsufficientStorage {
                op: StorageOp::Backup,
                required: 16,
                available: 15,
            }))
        );
        assert!(!backup_path_for(&file, &config.backup_path).exists());
    }

    #[test]
    fn test_save_as_copies_and_checks_space() {
        // Arrange
        let (dir, file, _config) = setup(&[9, 8, 7]);
        let dst = dir.path().join("copy.sav");

        // Act
        let denied = save_as(
            &file,
            &dst,
            2,
            &mut AutoFrontend::accept(),
            &FixedStorage(5),
            &StringTable::english(),
        );
        let saved = save_as(
            &file,
            &dst,
            2,
            &mut AutoFrontend::accept(),
            &FixedStorage(6),
            &StringTable::english(),
        );

        // Assert
        assert!(denied.is_err());
        assert!(saved.is_ok());
        assert_eq!(std::fs::read(dst).ok(), Some(vec![9, 8, 7]));
    }
}
