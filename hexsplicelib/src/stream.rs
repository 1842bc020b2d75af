//! The `stream` module provides [`StreamingStore`], the windowed store used for files
//! that cannot be held in memory.
//!
//! The file stays on disk behind a read/write handle. Every byte written through the
//! store is recorded in a [`ChangeMap`] keyed by absolute offset and only reaches the
//! file through [`StreamingStore::write_changes`]. While editing, a bounded
//! [`EditWindow`] mirrors part of the file (pending changes included) so repeated
//! access does not hit storage.

use crate::changes::ChangeMap;
use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::store::{ByteStore, try_alloc};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Contiguous slice of the backing file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditWindow {
    start: usize,
    data: Vec<u8>,
}

impl EditWindow {
    /// Absolute offset of the first resident byte.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset one past the last resident byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.data.len()
    }

    #[must_use]
    pub fn contains(&self, offset: usize, size: usize) -> bool {
        offset >= self.start && offset.saturating_add(size) <= self.end()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug)]
pub struct StreamingStore {
    path: PathBuf,
    file: File,
    total_size: usize,
    max_window_len: usize,
    changes: ChangeMap,
    window: Option<EditWindow>,
}

impl StreamingStore {
    /// Opens `path` for reading and writing.
    ///
    /// # Errors
    /// Returns `NotFound` if the file does not exist or an I/O error if it cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_window_len: usize) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let (file, total_size) = open_rw(path).map_err(HexSpliceError::LoadError)?;
        debug!("streaming 0x{total_size:X} bytes from {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_size,
            max_window_len,
            changes: ChangeMap::new(),
            window: None,
        })
    }

    /// Reopens the backing file after it was replaced on disk.
    /// Pending changes and the edit window are dropped.
    ///
    /// # Errors
    /// Returns the open error if the file cannot be reopened.
    pub fn reopen(&mut self) -> Result<(), HexSpliceError> {
        let (file, total_size) = open_rw(&self.path).map_err(HexSpliceError::LoadError)?;
        self.file = file;
        self.total_size = total_size;
        self.changes.clear();
        self.window = None;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn changes(&self) -> &ChangeMap {
        &self.changes
    }

    #[must_use]
    pub const fn window(&self) -> Option<&EditWindow> {
        self.window.as_ref()
    }

    #[must_use]
    pub const fn max_window_len(&self) -> usize {
        self.max_window_len
    }

    /// Loads up to `max_window_len` bytes starting at `start` into the edit window,
    /// replacing any previous window.
    ///
    /// # Errors
    /// - Returns `OutOfBounds` if `start` is past the end of the file.
    /// - Returns `AllocationFailure` or an I/O error if the window cannot be filled.
    pub fn open_window(&mut self, start: usize) -> Result<&EditWindow, HexSpliceError> {
        if start > self.total_size {
            return Err(HexSpliceError::EditError(HexSpliceErrorKind::OutOfBounds {
                offset: start,
                size: 0,
                len: self.total_size,
            }));
        }
        let len = self.max_window_len.min(self.total_size - start);
        let mut data = try_alloc(len).map_err(HexSpliceError::EditError)?;
        self.read_from_file(start, &mut data)?;
        self.changes.overlay(start, &mut data);
        debug!("edit window 0x{start:X}..0x{:X}", start + len);

        Ok(self.window.insert(EditWindow { start, data }))
    }

    /// Drops the edit window. Edits made through it are already in the change map.
    pub fn close_window(&mut self) {
        self.window = None;
    }

    /// Commits (`apply == true`) or discards the change map, then clears it.
    /// Returns the number of bytes written to the file.
    ///
    /// # Errors
    /// Returns an I/O error if a byte cannot be written; the map is kept in that case.
    pub fn write_changes(&mut self, apply: bool) -> Result<usize, HexSpliceError> {
        if self.changes.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        if apply {
            for (offset, value) in self.changes.iter() {
                self.file
                    .seek(SeekFrom::Start(offset as u64))
                    .and_then(|_| self.file.write_all(&[value]))
                    .map_err(|err| HexSpliceError::EditError(err.into()))?;
                written += 1;
            }
            self.file
                .flush()
                .map_err(|err| HexSpliceError::EditError(err.into()))?;
            info!("committed {written} change(s) to {}", self.path.display());
        } else {
            debug!("discarded {} change(s)", self.changes.len());
            if let Some(start) = self.window.as_ref().map(EditWindow::start) {
                self.changes.clear();
                self.open_window(start)?;
            }
        }

        self.changes.clear();
        Ok(written)
    }

    fn read_from_file(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HexSpliceError> {
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|err| HexSpliceError::EditError(err.into()))
    }
}

fn open_rw(path: &Path) -> Result<(File, usize), HexSpliceErrorKind> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|err| HexSpliceErrorKind::from_io(&err, path))?;
    let size = file.metadata()?.len();
    let size = usize::try_from(size).map_err(|_| HexSpliceErrorKind::AllocationFailure(usize::MAX))?;
    Ok((file, size))
}

impl ByteStore for StreamingStore {
    fn len(&self) -> usize {
        self.total_size
    }

    fn read_into(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HexSpliceError> {
        self.check_range(offset, buf.len())?;

        if let Some(window) = self.window.as_ref()
            && window.contains(offset, buf.len())
        {
            let rel = offset - window.start;
            buf.copy_from_slice(&window.data[rel..rel + buf.len()]);
            return Ok(());
        }

        self.read_from_file(offset, buf)?;
        self.changes.overlay(offset, buf);
        Ok(())
    }

    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), HexSpliceError> {
        self.check_range(offset, 1)?;
        if let Some(window) = self.window.as_mut()
            && window.contains(offset, 1)
        {
            window.data[offset - window.start] = value;
        }
        self.changes.record(offset, value);
        Ok(())
    }
}
