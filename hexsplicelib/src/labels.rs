//! Named offsets loaded from label documents.
//!
//! ```json
//! { "Header": { "ofs": "0x0", "size": 16 }, "Checksum": { "ofs": "0x1FC", "size": 4 } }
//! ```
//!
//! Labels keep the order of the document. An `ofs` without the `0x` prefix is
//! read as offset 0.

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub title: String,
    pub offset: usize,
    pub size: usize,
}

#[derive(Deserialize)]
struct RawLabel {
    ofs: String,
    size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<Label>,
}

impl LabelTable {
    /// # Errors
    /// Returns `BadLabelData` if the document is not an object of
    /// `{ "ofs": string, "size": number }` entries or an offset is not valid hex.
    pub fn from_json_str(json: &str) -> Result<Self, HexSpliceError> {
        let bad = || HexSpliceError::AssetError(HexSpliceErrorKind::BadLabelData);

        let doc: Map<String, Value> = serde_json::from_str(json).map_err(|_| bad())?;
        let mut labels = Vec::with_capacity(doc.len());

        for (title, entry) in doc {
            let raw: RawLabel = serde_json::from_value(entry).map_err(|_| bad())?;
            let offset = match raw.ofs.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16).map_err(|_| bad())?,
                None => 0,
            };
            labels.push(Label {
                title,
                offset,
                size: raw.size,
            });
        }

        Ok(Self { labels })
    }

    /// # Errors
    /// Returns `NotFound` if the file is missing, `BadLabelData` if it is malformed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| HexSpliceError::AssetError(HexSpliceErrorKind::from_io(&err, path)))?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn find(&self, title: &str) -> Option<&Label> {
        self.labels.iter().find(|label| label.title == title)
    }

    #[must_use]
    pub fn offset_of(&self, title: &str) -> Option<usize> {
        self.find(title).map(|label| label.offset)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<'a> IntoIterator for &'a LabelTable {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;
    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_keep_document_order() {
        // Arrange
        let json = r#"{
            "Zeta": { "ofs": "0x20", "size": 4 },
            "Alpha": { "ofs": "0x1F0", "size": 2 },
            "Plain": { "ofs": "16", "size": 1 }
        }"#;

        // Act
        let table = LabelTable::from_json_str(json).unwrap_or_default();

        // Assert
        let titles: Vec<&str> = table.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Plain"]);
        assert_eq!(table.find("Alpha").map(|l| l.offset), Some(0x1F0));
        assert_eq!(table.find("Plain").map(|l| l.offset), Some(0));
    }

    #[test]
    fn test_malformed_labels_are_rejected() {
        for json in [
            r#"{ "A": { "ofs": "0xZZ", "size": 1 } }"#,
            r#"{ "A": { "size": 1 } }"#,
            r#"[ 1, 2 ]"#,
        ] {
            assert_eq!(
                LabelTable::from_json_str(json),
                Err(HexSpliceError::AssetError(HexSpliceErrorKind::BadLabelData))
            );
        }
    }
}
