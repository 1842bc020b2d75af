//! Byte to glyph table used for the text column and for text search.
//!
//! Encoding documents are JSON objects with a `map` object keyed by two-digit
//! uppercase hex strings:
//!
//! ```json
//! { "map": { "41": "A", "42": "B" } }
//! ```
//!
//! Bytes without an entry are shown as `"."`.

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

const UNMAPPED: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingTable {
    /// `None` for bytes without an entry
    glyphs: Vec<Option<String>>,
}

impl Default for EncodingTable {
    fn default() -> Self {
        Self::ascii()
    }
}

impl EncodingTable {
    /// Every byte unmapped.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            glyphs: vec![None; 256],
        }
    }

    /// Printable ASCII mapped to itself, everything else unmapped.
    #[must_use]
    pub fn ascii() -> Self {
        let glyphs = (0..=u8::MAX)
            .map(|byte| {
                (byte.is_ascii_graphic() || byte == b' ').then(|| char::from(byte).to_string())
            })
            .collect();
        Self { glyphs }
    }

    /// Parses an encoding document.
    ///
    /// # Errors
    /// Returns `BadEncodingData` if the document has no `map` object or a
    /// mapped value is not a string.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::EncodingTable;
    ///
    /// let table = EncodingTable::from_json_str(r#"{ "map": { "00": "@" } }"#).unwrap();
    /// assert_eq!(table.glyph(0x00), "@");
    /// assert_eq!(table.glyph(0x41), ".");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, HexSpliceError> {
        let bad = || HexSpliceError::AssetError(HexSpliceErrorKind::BadEncodingData);

        let doc: Value = serde_json::from_str(json).map_err(|_| bad())?;
        let map = doc.get("map").and_then(Value::as_object).ok_or_else(bad)?;

        let mut table = Self::blank();
        for (byte, glyph) in table.glyphs.iter_mut().enumerate() {
            if let Some(value) = map.get(&format!("{byte:02X}")) {
                *glyph = Some(value.as_str().ok_or_else(bad)?.to_string());
            }
        }
        Ok(table)
    }

    /// # Errors
    /// Returns `NotFound` if the file is missing, `BadEncodingData` if it is malformed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| HexSpliceError::AssetError(HexSpliceErrorKind::from_io(&err, path)))?;
        Self::from_json_str(&json)
    }

    /// Replaces this table with the one at `path`. On failure the table is left
    /// untouched and the error is returned for reporting.
    ///
    /// # Errors
    /// Same as [`EncodingTable::from_json_file`].
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), HexSpliceError> {
        match Self::from_json_file(&path) {
            Ok(table) => {
                *self = table;
                Ok(())
            }
            Err(err) => {
                warn!(
                    "keeping current encoding, {} not loaded: {err}",
                    path.as_ref().display()
                );
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn glyph(&self, byte: u8) -> &str {
        self.glyphs[usize::from(byte)].as_deref().unwrap_or(UNMAPPED)
    }

    /// First mapped byte whose glyph is `glyph`. Unmapped bytes never match.
    #[must_use]
    pub fn byte_for(&self, glyph: &str) -> Option<u8> {
        self.glyphs
            .iter()
            .position(|g| g.as_deref() == Some(glyph))
            .and_then(|idx| u8::try_from(idx).ok())
    }

    /// Encodes `text` character by character. Characters without a byte are skipped.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut buf = [0u8; 4];
        text.chars()
            .filter_map(|ch| self.byte_for(ch.encode_utf8(&mut buf)))
            .collect()
    }

    /// Renders `bytes` as text using the table.
    #[must_use]
    pub fn render(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.glyph(b)).collect()
    }
}
