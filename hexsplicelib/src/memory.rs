//! The `memory` module provides [`ByteBuffer`], the whole-file in-memory store.
//!
//! Every mutation sets a dirty flag that is cleared only when the buffer is
//! written back or reverted to the file contents.

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::store::{ByteStore, try_alloc};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    /// File the buffer was loaded from
    path: PathBuf,
    /// Whole file contents
    data: Vec<u8>,
    /// Set by every mutation until the next save or revert
    dirty: bool,
}

impl ByteBuffer {
    /// Loads the whole file at `path` into memory.
    ///
    /// # Errors
    /// - Returns `NotFound` if the file does not exist.
    /// - Returns `AllocationFailure` if a buffer of the file's size cannot be allocated.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::ByteBuffer;
    ///
    /// let res = ByteBuffer::load("no/such/file.bin");
    /// assert!(res.is_err());
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let data = read_whole(path).map_err(HexSpliceError::LoadError)?;
        debug!("loaded 0x{:X} bytes from {}", data.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            data,
            dirty: false,
        })
    }

    /// Creates a buffer for a new file at `path` holding a single zero byte.
    /// Nothing is written until [`ByteBuffer::save`] is called.
    #[must_use]
    pub fn new_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data: vec![0x00],
            dirty: true,
        }
    }

    /// Creates a buffer over bytes that are not backed by a file yet.
    #[must_use]
    pub fn from_bytes<P: AsRef<Path>>(path: P, data: Vec<u8>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data,
            dirty: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Inserts `data` at `offset`. An offset equal to the length appends.
    ///
    /// # Errors
    /// - Returns `OutOfBounds` if `offset` is past the end of the buffer.
    /// - Returns `AllocationFailure` if the buffer cannot grow.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::ByteBuffer;
    ///
    /// let mut buf = ByteBuffer::from_bytes("a.bin", vec![1, 4]);
    /// buf.insert_bytes(1, &[2, 3]).unwrap();
    /// assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
    /// ```
    pub fn insert_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), HexSpliceError> {
        if offset > self.data.len() {
            return Err(HexSpliceError::EditError(HexSpliceErrorKind::OutOfBounds {
                offset,
                size: data.len(),
                len: self.data.len(),
            }));
        }
        self.data
            .try_reserve(data.len())
            .map_err(|_| {
                HexSpliceError::EditError(HexSpliceErrorKind::AllocationFailure(
                    self.data.len().saturating_add(data.len()),
                ))
            })?;

        self.data.splice(offset..offset, data.iter().copied());
        self.dirty = true;
        Ok(())
    }

    /// Removes `[offset, offset + size)`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the range exceeds the buffer.
    pub fn erase_bytes(&mut self, offset: usize, size: usize) -> Result<(), HexSpliceError> {
        self.check_range(offset, size)?;
        self.data.drain(offset..offset + size);
        self.dirty = true;
        Ok(())
    }

    /// Overwrites `path` with the whole buffer. Returns `false` if the destination
    /// cannot be opened or written.
    pub fn write_back<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let res = File::create(path).and_then(|mut file| {
            file.write_all(&self.data)?;
            file.flush()
        });
        match res {
            Ok(()) => {
                info!("wrote 0x{:X} bytes to {}", self.data.len(), path.display());
                true
            }
            Err(err) => {
                debug!("write back to {} failed: {err}", path.display());
                false
            }
        }
    }

    /// Writes the buffer back to its own file and clears the dirty flag.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&mut self) -> Result<(), HexSpliceError> {
        let path = self.path.clone();
        if !self.write_back(&path) {
            return Err(HexSpliceError::EditError(HexSpliceErrorKind::Io(
                std::io::ErrorKind::Other,
            )));
        }
        self.dirty = false;
        Ok(())
    }

    /// Drops all in-memory edits by reloading the file.
    ///
    /// # Errors
    /// Returns the load error if the file can no longer be read.
    pub fn revert(&mut self) -> Result<(), HexSpliceError> {
        self.data = read_whole(&self.path).map_err(HexSpliceError::LoadError)?;
        self.dirty = false;
        Ok(())
    }
}

fn read_whole(path: &Path) -> Result<Vec<u8>, HexSpliceErrorKind> {
    let mut file = File::open(path).map_err(|err| HexSpliceErrorKind::from_io(&err, path))?;
    let size = file.metadata()?.len();
    let size = usize::try_from(size).map_err(|_| HexSpliceErrorKind::AllocationFailure(usize::MAX))?;

    let mut data = try_alloc(size)?;
    file.read_exact(&mut data)?;
    Ok(data)
}

impl ByteStore for ByteBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn read_into(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HexSpliceError> {
        self.check_range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), HexSpliceError> {
        self.check_range(offset, 1)?;
        self.data[offset] = value;
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::typed::Endianness;

    #[test]
    fn test_new_file_is_one_zero_byte() {
        // Act
        let buf = ByteBuffer::new_file("new.bin");

        // Assert
        assert_eq!(buf.as_slice(), &[0x00]);
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_insert_append_and_out_of_bounds() {
        // Arrange
        let mut buf = ByteBuffer::from_bytes("a.bin", vec![1, 2]);

        // Act
        let appended = buf.insert_bytes(2, &[3]);
        let rejected = buf.insert_bytes(5, &[9]);

        // Assert
        assert!(appended.is_ok());
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
        assert_eq!(
            rejected,
            Err(HexSpliceError::EditError(HexSpliceErrorKind::OutOfBounds {
                offset: 5,
                size: 1,
                len: 3
            }))
        );
    }

    #[test]
    fn test_erase_bytes() {
        // Arrange
        let mut buf = ByteBuffer::from_bytes("a.bin", vec![0, 1, 2, 3, 4]);

        // Act
        let ok = buf.erase_bytes(1, 3);
        let too_long = buf.erase_bytes(1, 2);

        // Assert
        assert!(ok.is_ok());
        assert_eq!(buf.as_slice(), &[0, 4]);
        assert!(too_long.is_err());
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_typed_write_marks_dirty() {
        // Arrange
        let mut buf = ByteBuffer::from_bytes("a.bin", vec![0; 4]);

        // Act
        let written = buf.write_typed::<u32>(0, 0xDEAD_BEEF, Endianness::Big);

        // Assert
        assert!(written);
        assert!(buf.is_dirty());
        assert_eq!(buf.as_slice(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(buf.read_typed::<u32>(0, Endianness::Little), 0xEFBE_ADDE);
    }

    #[test]
    fn test_save_and_revert() {
        // Arrange
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [1, 2, 3]).expect("Failed to write file");
        let mut buf = ByteBuffer::load(&path).expect("Failed to load file");

        // Act
        buf.put_byte(0, 0xFF).expect("Failed to write byte");
        buf.revert().expect("Failed to revert");
        buf.put_byte(2, 0xEE).expect("Failed to write byte");
        buf.save().expect("Failed to save");

        // Assert
        assert!(!buf.is_dirty());
        assert_eq!(std::fs::read(&path).ok(), Some(vec![1, 2, 0xEE]));
    }

    #[test]
    fn test_write_back_to_missing_dir_fails() {
        // Arrange
        let buf = ByteBuffer::from_bytes("a.bin", vec![1]);

        // Act & Assert
        assert!(!buf.write_back("no/such/dir/out.bin"));
    }
}
