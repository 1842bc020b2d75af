//! Translatable user-facing text.
//!
//! The engine never builds UI text itself. It passes one of the [`keys`] to a
//! [`StringTable`] and forwards the result to the frontend.

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use std::collections::HashMap;
use std::path::Path;

pub mod keys {
    pub const INSERT_WARNING: &str = "INSERT_WARNING";
    pub const REMOVE_WARNING: &str = "REMOVE_WARNING";
    pub const INSERT_STEP_1: &str = "INSERT_STEP_1";
    pub const INSERT_STEP_2: &str = "INSERT_STEP_2";
    pub const INSERT_STEP_3: &str = "INSERT_STEP_3";
    pub const REMOVE_STEP_1: &str = "REMOVE_STEP_1";
    pub const REMOVE_STEP_2: &str = "REMOVE_STEP_2";
    pub const NOT_ENOUGH_SPACE_INSERT: &str = "NOT_ENOUGH_SPACE_INSERT";
    pub const NOT_ENOUGH_SPACE_REMOVE: &str = "NOT_ENOUGH_SPACE_REMOVE";
    pub const NOT_ENOUGH_SPACE_BACKUP: &str = "NOT_ENOUGH_SPACE_BACKUP";
    pub const NOT_ENOUGH_SPACE_SAVE: &str = "NOT_ENOUGH_SPACE_SAVE";
    pub const CREATE_BACKUP: &str = "CREATE_BACKUP";
    pub const BACKING_UP_FILE: &str = "BACKING_UP_FILE";
    pub const SAVING_FILE: &str = "SAVING_FILE";
    pub const CHANGES_MADE: &str = "CHANGES_MADE";
    pub const SEARCH_MATCHES: &str = "SEARCH_MATCHES";
    pub const NO_RESULTS_FOUND: &str = "NO_RESULTS_FOUND";
    pub const COMPARING_FILES: &str = "COMPARING_FILES";
}

const ENGLISH: &[(&str, &str)] = &[
    (keys::INSERT_WARNING, "Insert bytes? This rewrites the whole file."),
    (keys::REMOVE_WARNING, "Remove bytes? This rewrites the whole file."),
    (keys::INSERT_STEP_1, "Copying data before the insert point..."),
    (keys::INSERT_STEP_2, "Writing inserted bytes..."),
    (keys::INSERT_STEP_3, "Copying data after the insert point..."),
    (keys::REMOVE_STEP_1, "Copying data before the removed range..."),
    (keys::REMOVE_STEP_2, "Copying data after the removed range..."),
    (keys::NOT_ENOUGH_SPACE_INSERT, "Not enough free space to insert bytes."),
    (keys::NOT_ENOUGH_SPACE_REMOVE, "Not enough free space to remove bytes."),
    (
        keys::NOT_ENOUGH_SPACE_BACKUP,
        "Not enough free space for a backup. Continue without one?",
    ),
    (keys::NOT_ENOUGH_SPACE_SAVE, "Not enough free space to save the file."),
    (keys::CREATE_BACKUP, "Create a backup of the file first?"),
    (keys::BACKING_UP_FILE, "Backing up file..."),
    (keys::SAVING_FILE, "Saving file..."),
    (keys::CHANGES_MADE, "Save the changes made to the file?"),
    (keys::SEARCH_MATCHES, "Searching..."),
    (keys::NO_RESULTS_FOUND, "No results found."),
    (keys::COMPARING_FILES, "Comparing files..."),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    entries: HashMap<String, String>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::english()
    }
}

impl StringTable {
    /// Built-in English strings for every key in [`keys`].
    #[must_use]
    pub fn english() -> Self {
        Self {
            entries: ENGLISH
                .iter()
                .map(|&(key, text)| (key.to_string(), text.to_string()))
                .collect(),
        }
    }

    /// Parses a flat JSON object of key to text. Keys missing from the document
    /// keep their English text.
    ///
    /// # Errors
    /// Returns `BadStringData` if the document is not a flat object of strings.
    pub fn from_json_str(json: &str) -> Result<Self, HexSpliceError> {
        let parsed: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|_| HexSpliceError::AssetError(HexSpliceErrorKind::BadStringData))?;

        let mut table = Self::english();
        table.entries.extend(parsed);
        Ok(table)
    }

    /// # Errors
    /// Returns `NotFound` if the file is missing, `BadStringData` if it is malformed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| HexSpliceError::AssetError(HexSpliceErrorKind::from_io(&err, path)))?;
        Self::from_json_str(&json)
    }

    /// Text for `key`, or the key itself when it is unknown.
    #[must_use]
    pub fn lookup(&self, key: &str) -> String {
        self.entries
            .get(key)
            .map_or_else(|| key.to_string(), Clone::clone)
    }

    /// Text for `key` followed by a hex counter on a new line.
    #[must_use]
    pub fn with_counter(&self, key: &str, counter: usize) -> String {
        format!("{}\n0x{counter:X}", self.lookup(key))
    }
}
