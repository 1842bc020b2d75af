//! The `store` module defines the [`ByteStore`] contract shared by the two backing
//! strategies, and [`Store`], which picks one of them when a file is opened.
//!
//! - [`ByteBuffer`] holds the whole file in memory.
//! - [`StreamingStore`] keeps the file on disk, tracks edits in a change map and
//!   pulls a bounded window into memory while editing.
//!
//! Typed, bit and nibble access is implemented once on top of `read_into` and
//! `put_byte`, so both strategies share the same semantics.

use crate::config::{EngineConfig, StoreStrategy};
use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::memory::ByteBuffer;
use crate::stream::StreamingStore;
use crate::typed::{self, Endianness, Primitive};
use std::path::Path;
use tracing::{debug, warn};

/// Allocates a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc(len: usize) -> Result<Vec<u8>, HexSpliceErrorKind> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| HexSpliceErrorKind::AllocationFailure(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

pub trait ByteStore {
    /// Current logical length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` with the bytes starting at `offset`, pending edits included.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the range exceeds the store.
    fn read_into(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HexSpliceError>;

    /// Sets a single byte.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `offset` is past the end of the store.
    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), HexSpliceError>;

    /// Checks that `[offset, offset + size)` lies within the store.
    ///
    /// # Errors
    /// Returns `OutOfBounds` otherwise.
    fn check_range(&self, offset: usize, size: usize) -> Result<(), HexSpliceError> {
        let len = self.len();
        match offset.checked_add(size) {
            Some(end) if end <= len => Ok(()),
            _ => Err(HexSpliceError::EditError(HexSpliceErrorKind::OutOfBounds {
                offset,
                size,
                len,
            })),
        }
    }

    /// # Errors
    /// Returns `OutOfBounds` if `offset` is past the end of the store.
    fn byte_at(&mut self, offset: usize) -> Result<u8, HexSpliceError> {
        let mut buf = [0u8; 1];
        self.read_into(offset, &mut buf)?;
        Ok(buf[0])
    }

    /// Reads up to `len` bytes starting at `offset`, stopping at the end of the store.
    ///
    /// # Errors
    /// Returns `AllocationFailure` if the buffer cannot be allocated.
    fn read_clamped(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, HexSpliceError> {
        let end = offset.saturating_add(len).min(self.len());
        if offset >= end {
            return Ok(Vec::new());
        }
        let mut buf = try_alloc(end - offset).map_err(HexSpliceError::EditError)?;
        self.read_into(offset, &mut buf)?;
        Ok(buf)
    }

    /// Reads a `T` at `offset`. Out-of-bounds reads yield zero.
    fn read_typed<T: Primitive>(&mut self, offset: usize, endian: Endianness) -> T {
        if self.check_range(offset, T::SIZE).is_err() {
            return T::default();
        }
        let mut bytes = [0u8; 8];
        match self.read_into(offset, &mut bytes[..T::SIZE]) {
            Ok(()) => T::compose(&bytes[..T::SIZE], endian),
            Err(_) => T::default(),
        }
    }

    /// Writes a `T` at `offset`. Out-of-bounds writes are ignored.
    /// Returns whether the value was written.
    fn write_typed<T: Primitive>(&mut self, offset: usize, value: T, endian: Endianness) -> bool {
        if self.check_range(offset, T::SIZE).is_err() {
            return false;
        }
        let mut bytes = [0u8; 8];
        value.decompose(endian, &mut bytes[..T::SIZE]);
        bytes[..T::SIZE]
            .iter()
            .enumerate()
            .all(|(idx, &byte)| self.put_byte(offset + idx, byte).is_ok())
    }

    /// # Errors
    /// Returns `InvalidBitIndex` for `idx > 7` or `OutOfBounds` for a bad offset.
    fn read_bit(&mut self, offset: usize, idx: u8) -> Result<bool, HexSpliceError> {
        typed::check_bit_index(idx).map_err(HexSpliceError::EditError)?;
        Ok(typed::bit(self.byte_at(offset)?, idx))
    }

    /// # Errors
    /// Returns `InvalidBitIndex` for `idx > 7` or `OutOfBounds` for a bad offset.
    fn write_bit(&mut self, offset: usize, idx: u8, set: bool) -> Result<(), HexSpliceError> {
        typed::check_bit_index(idx).map_err(HexSpliceError::EditError)?;
        let byte = self.byte_at(offset)?;
        self.put_byte(offset, typed::with_bit(byte, idx, set))
    }

    /// # Errors
    /// Returns `OutOfBounds` for a bad offset.
    fn read_nibble(&mut self, offset: usize, low: bool) -> Result<u8, HexSpliceError> {
        Ok(typed::nibble(self.byte_at(offset)?, low))
    }

    /// # Errors
    /// Returns `InvalidNibbleValue` for `value > 0xF` or `OutOfBounds` for a bad offset.
    fn write_nibble(&mut self, offset: usize, low: bool, value: u8) -> Result<(), HexSpliceError> {
        typed::check_nibble_value(value).map_err(HexSpliceError::EditError)?;
        let byte = self.byte_at(offset)?;
        self.put_byte(offset, typed::with_nibble(byte, low, value))
    }
}

/// Backing strategy selected when a session is opened.
#[derive(Debug)]
pub enum Store {
    InMemory(ByteBuffer),
    Streaming(StreamingStore),
}

impl Store {
    /// Opens `path` with the strategy requested by `config`.
    ///
    /// With [`StoreStrategy::Auto`], files up to `in_memory_limit` bytes are loaded
    /// whole. If that allocation fails the file is streamed instead.
    ///
    /// # Errors
    /// Returns `NotFound` if the path does not exist, or the error of the chosen strategy.
    pub fn open<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)
            .map_err(|err| HexSpliceError::LoadError(HexSpliceErrorKind::from_io(&err, path)))?
            .len();

        match config.strategy {
            StoreStrategy::InMemory => Ok(Self::InMemory(ByteBuffer::load(path)?)),
            StoreStrategy::Streaming => Ok(Self::Streaming(StreamingStore::open(
                path,
                config.window_len(),
            )?)),
            StoreStrategy::Auto if size <= config.in_memory_limit => {
                match ByteBuffer::load(path) {
                    Ok(buffer) => Ok(Self::InMemory(buffer)),
                    Err(HexSpliceError::LoadError(HexSpliceErrorKind::AllocationFailure(len))) => {
                        warn!("could not hold 0x{len:X} bytes in memory, streaming instead");
                        Ok(Self::Streaming(StreamingStore::open(
                            path,
                            config.window_len(),
                        )?))
                    }
                    Err(err) => Err(err),
                }
            }
            StoreStrategy::Auto => {
                debug!("file of 0x{size:X} bytes exceeds the in-memory limit, streaming");
                Ok(Self::Streaming(StreamingStore::open(
                    path,
                    config.window_len(),
                )?))
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::InMemory(buffer) => buffer.path(),
            Self::Streaming(stream) => stream.path(),
        }
    }

    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    /// Number of pending byte edits of a streamed file. An in-memory buffer does not
    /// track single bytes and reports 1 while it is dirty.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        match self {
            Self::InMemory(buffer) if buffer.is_dirty() => 1,
            Self::InMemory(_) => 0,
            Self::Streaming(stream) => stream.changes().len(),
        }
    }

    /// Commits (`apply == true`) or discards pending edits.
    ///
    /// # Errors
    /// Returns an I/O error if the backing file cannot be written or re-read.
    pub fn commit(&mut self, apply: bool) -> Result<(), HexSpliceError> {
        match self {
            Self::InMemory(buffer) => {
                if !buffer.is_dirty() {
                    return Ok(());
                }
                if apply { buffer.save() } else { buffer.revert() }
            }
            Self::Streaming(stream) => stream.write_changes(apply).map(|_| ()),
        }
    }

    /// Bounds of the resident edit window, if any.
    #[must_use]
    pub fn window_bounds(&self) -> Option<(usize, usize)> {
        match self {
            Self::InMemory(_) => None,
            Self::Streaming(stream) => stream.window().map(|w| (w.start(), w.end())),
        }
    }

    /// Re-reads the backing file after it was replaced on disk.
    ///
    /// # Errors
    /// Returns the load error of the underlying strategy.
    pub fn reload(&mut self) -> Result<(), HexSpliceError> {
        match self {
            Self::InMemory(buffer) => buffer.revert(),
            Self::Streaming(stream) => stream.reopen(),
        }
    }
}

impl ByteStore for Store {
    fn len(&self) -> usize {
        match self {
            Self::InMemory(buffer) => buffer.len(),
            Self::Streaming(stream) => stream.len(),
        }
    }

    fn read_into(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HexSpliceError> {
        match self {
            Self::InMemory(buffer) => buffer.read_into(offset, buf),
            Self::Streaming(stream) => stream.read_into(offset, buf),
        }
    }

    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), HexSpliceError> {
        match self {
            Self::InMemory(buffer) => buffer.put_byte(offset, value),
            Self::Streaming(stream) => stream.put_byte(offset, value),
        }
    }
}
