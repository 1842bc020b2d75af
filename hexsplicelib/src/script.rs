//! Read/write surface exposed to user scripts.
//!
//! Every call validates its arguments against the current store before touching
//! any byte, and reports violations as [`HexSpliceError::ScriptError`].

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::store::ByteStore;
use crate::typed::{Endianness, ScalarType};
use std::path::Path;

fn script_err(err: HexSpliceError) -> HexSpliceError {
    HexSpliceError::ScriptError(err.into_kind())
}

pub struct ScriptApi<'a, S: ByteStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: ByteStore + ?Sized> ScriptApi<'a, S> {
    pub const fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    fn check(&self, offset: usize, size: usize) -> Result<(), HexSpliceError> {
        self.store.check_range(offset, size).map_err(script_err)
    }

    /// Reads `count` consecutive values of `ty` starting at `offset`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `offset + count * width` exceeds the file.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::{ByteBuffer, Endianness, ScalarType, ScriptApi};
    ///
    /// let mut buf = ByteBuffer::from_bytes("a.bin", vec![0x12, 0x34, 0x56, 0x78]);
    /// let mut api = ScriptApi::new(&mut buf);
    /// let values = api.read(ScalarType::U16, 0, 2, Endianness::Big).unwrap();
    /// assert_eq!(values, vec![0x1234, 0x5678]);
    /// ```
    pub fn read(
        &mut self,
        ty: ScalarType,
        offset: usize,
        count: usize,
        endian: Endianness,
    ) -> Result<Vec<u64>, HexSpliceError> {
        let width = ty.width();
        self.check(offset, count.saturating_mul(width))?;

        Ok((0..count)
            .map(|idx| {
                let at = offset + idx * width;
                match ty {
                    ScalarType::U8 => u64::from(self.store.read_typed::<u8>(at, endian)),
                    ScalarType::U16 => u64::from(self.store.read_typed::<u16>(at, endian)),
                    ScalarType::U32 => u64::from(self.store.read_typed::<u32>(at, endian)),
                    ScalarType::U64 => self.store.read_typed::<u64>(at, endian),
                }
            })
            .collect())
    }

    /// Writes `values` as consecutive `ty` values starting at `offset`. Values wider
    /// than `ty` are truncated.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the values do not fit; nothing is written then.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(
        &mut self,
        ty: ScalarType,
        offset: usize,
        values: &[u64],
        endian: Endianness,
    ) -> Result<(), HexSpliceError> {
        let width = ty.width();
        self.check(offset, values.len().saturating_mul(width))?;

        for (idx, &value) in values.iter().enumerate() {
            let at = offset + idx * width;
            match ty {
                ScalarType::U8 => self.store.write_typed(at, value as u8, endian),
                ScalarType::U16 => self.store.write_typed(at, value as u16, endian),
                ScalarType::U32 => self.store.write_typed(at, value as u32, endian),
                ScalarType::U64 => self.store.write_typed(at, value, endian),
            };
        }
        Ok(())
    }

    /// # Errors
    /// Returns `InvalidBitIndex` or `OutOfBounds`.
    pub fn read_bit(&mut self, offset: usize, idx: u8) -> Result<bool, HexSpliceError> {
        self.store.read_bit(offset, idx).map_err(script_err)
    }

    /// # Errors
    /// Returns `InvalidBitIndex` or `OutOfBounds`.
    pub fn write_bit(&mut self, offset: usize, idx: u8, set: bool) -> Result<(), HexSpliceError> {
        self.store.write_bit(offset, idx, set).map_err(script_err)
    }

    /// Reads the low (`bits 0-3`) or high (`bits 4-7`) nibble.
    ///
    /// # Errors
    /// Returns `OutOfBounds`.
    pub fn read_bits(&mut self, offset: usize, low: bool) -> Result<u8, HexSpliceError> {
        self.store.read_nibble(offset, low).map_err(script_err)
    }

    /// # Errors
    /// Returns `InvalidNibbleValue` or `OutOfBounds`.
    pub fn write_bits(&mut self, offset: usize, low: bool, value: u8) -> Result<(), HexSpliceError> {
        self.store.write_nibble(offset, low, value).map_err(script_err)
    }

    /// Writes `[offset, offset + size)` to a new file at `dest`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` for a bad range or an I/O error if `dest` cannot be written.
    pub fn dump_bytes<P: AsRef<Path>>(
        &mut self,
        offset: usize,
        size: usize,
        dest: P,
    ) -> Result<(), HexSpliceError> {
        self.check(offset, size)?;
        let data = self.store.read_clamped(offset, size).map_err(script_err)?;
        std::fs::write(dest, data).map_err(|e| HexSpliceError::ScriptError(e.into()))
    }

    /// Overwrites the bytes at `offset` with the content of the file at `src`.
    ///
    /// # Errors
    /// Returns `NotFound` if `src` does not exist or `OutOfBounds` if its content
    /// does not fit.
    pub fn inject_file<P: AsRef<Path>>(&mut self, offset: usize, src: P) -> Result<(), HexSpliceError> {
        let src = src.as_ref();
        let data = std::fs::read(src)
            .map_err(|e| HexSpliceError::ScriptError(HexSpliceErrorKind::from_io(&e, src)))?;
        self.inject_bytes(offset, &data)
    }

    /// Overwrites the bytes at `offset` with `data`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `data` does not fit.
    pub fn inject_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), HexSpliceError> {
        self.check(offset, data.len())?;
        for (idx, &byte) in data.iter().enumerate() {
            self.store.put_byte(offset + idx, byte).map_err(script_err)?;
        }
        Ok(())
    }

    /// Size of the open file.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.store.len()
    }

    /// Size of any file, `None` if it cannot be queried.
    #[must_use]
    pub fn file_size_of<P: AsRef<Path>>(path: P) -> Option<u64> {
        std::fs::metadata(path).ok().map(|meta| meta.len())
    }
}
