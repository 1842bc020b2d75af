//! Configuration consumed by the engine.
//!
//! [`EditorConfig`] is the persisted user preference document (read only, never
//! written here). [`EngineConfig`] carries the engine tunables and [`DataRoot`]
//! the fixed on-disk layout of the application data directory.

use crate::error::{HexSpliceError, HexSpliceErrorKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Copy size used by splice passes, backups and save-as.
pub const DEFAULT_BUFFER_SIZE: usize = 0x80000;
/// Upper bound of the resident edit window.
pub const DEFAULT_MAX_WINDOW_LEN: usize = 0x20000;
/// Rows shown per page.
pub const DEFAULT_LINES_PER_PAGE: usize = 0xD;
/// Files up to this size are held in memory by [`StoreStrategy::Auto`].
pub const DEFAULT_IN_MEMORY_LIMIT: u64 = 0x40_0000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum BackupPolicy {
    Always,
    Never,
    #[default]
    Ask,
}

impl TryFrom<u8> for BackupPolicy {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Always),
            1 => Ok(Self::Never),
            2 => Ok(Self::Ask),
            other => Err(format!("invalid backup policy {other}")),
        }
    }
}

/// Width of the byte groups shown by the renderer and used as the selection size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ByteGroup {
    #[default]
    One,
    Two,
    Four,
    Eight,
    Sixteen,
}

impl ByteGroup {
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }
}

impl TryFrom<u8> for ByteGroup {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            other => Err(format!("invalid byte group {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ViewMode {
    #[default]
    HexOnly,
    TextOnly,
    HexAndText,
}

impl TryFrom<u8> for ViewMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::HexOnly),
            1 => Ok(Self::TextOnly),
            2 => Ok(Self::HexAndText),
            other => Err(format!("invalid view mode {other}")),
        }
    }
}

/// Persisted editor preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    #[serde(rename = "Backup")]
    pub backup: BackupPolicy,
    #[serde(rename = "BackupPath")]
    pub backup_path: PathBuf,
    #[serde(rename = "ByteGroup")]
    pub byte_group: ByteGroup,
    #[serde(rename = "DefaultHexView")]
    pub view_mode: ViewMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            backup: BackupPolicy::default(),
            backup_path: PathBuf::from("backups"),
            byte_group: ByteGroup::default(),
            view_mode: ViewMode::default(),
        }
    }
}

impl EditorConfig {
    /// Parses a config document. Unknown keys are ignored and missing keys keep
    /// their defaults.
    ///
    /// # Errors
    /// Returns `BadConfigData` if the document is malformed.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::{BackupPolicy, EditorConfig};
    ///
    /// let cfg = EditorConfig::from_json_str(r#"{ "Backup": 1, "Theme": 3 }"#).unwrap();
    /// assert_eq!(cfg.backup, BackupPolicy::Never);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, HexSpliceError> {
        serde_json::from_str(json)
            .map_err(|_| HexSpliceError::AssetError(HexSpliceErrorKind::BadConfigData))
    }

    /// Reads and parses the config document at `path`.
    ///
    /// # Errors
    /// Returns `NotFound` if the file is missing, `BadConfigData` if it is malformed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HexSpliceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| HexSpliceError::AssetError(HexSpliceErrorKind::from_io(&err, path)))?;
        Self::from_json_str(&json)
    }
}

/// Which backing store a session opens with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreStrategy {
    /// In memory up to [`EngineConfig::in_memory_limit`], streaming above it
    #[default]
    Auto,
    InMemory,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Chunk size of every bounded copy loop
    pub buffer_size: usize,
    /// Upper bound of the resident edit window
    pub max_window_len: usize,
    /// Rows shown per page (16 bytes each)
    pub lines_per_page: usize,
    /// Reserved scratch file used while splicing
    pub scratch_path: PathBuf,
    /// Largest file size held in memory by [`StoreStrategy::Auto`]
    pub in_memory_limit: u64,
    pub strategy: StoreStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_data_root(&DataRoot::default())
    }
}

impl EngineConfig {
    #[must_use]
    pub fn for_data_root(root: &DataRoot) -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_window_len: DEFAULT_MAX_WINDOW_LEN,
            lines_per_page: DEFAULT_LINES_PER_PAGE,
            scratch_path: root.scratch_path(),
            in_memory_limit: DEFAULT_IN_MEMORY_LIMIT,
            strategy: StoreStrategy::default(),
        }
    }

    /// Bytes shown per page.
    #[must_use]
    pub const fn bytes_per_page(&self) -> usize {
        self.lines_per_page * 16
    }

    /// Window length actually used: never smaller than one page.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.max_window_len.max(self.bytes_per_page())
    }

    /// Copy chunk size actually used: never zero.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.buffer_size.max(1)
    }
}

/// Fixed layout of the application data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot {
    root: PathBuf,
}

impl Default for DataRoot {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("hexsplice"))
    }
}

impl DataRoot {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join("Hex-Editor").join("Config.json")
    }

    #[must_use]
    pub fn scratch_path(&self) -> PathBuf {
        self.root.join("Hex-Editor").join("Temp.bin")
    }

    #[must_use]
    pub fn encodings_dir(&self) -> PathBuf {
        self.root.join("encodings")
    }

    #[must_use]
    pub fn labels_dir(&self) -> PathBuf {
        self.root.join("labels")
    }

    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    #[must_use]
    pub fn lang_dir(&self) -> PathBuf {
        self.root.join("lang")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_config_full_document() {
        // Arrange
        let json = r#"{
            "Backup": 0,
            "BackupPath": "/data/Backups/",
            "ByteGroup": 4,
            "DefaultHexView": 2,
            "Lang": "en",
            "Theme": 1
        }"#;

        // Act
        let cfg = EditorConfig::from_json_str(json);

        // Assert
        assert_eq!(
            cfg,
            Ok(EditorConfig {
                backup: BackupPolicy::Always,
                backup_path: PathBuf::from("/data/Backups/"),
                byte_group: ByteGroup::Four,
                view_mode: ViewMode::HexAndText,
            })
        );
    }

    #[test]
    fn test_editor_config_defaults_for_missing_keys() {
        // Act
        let cfg = EditorConfig::from_json_str("{}");

        // Assert
        assert_eq!(cfg, Ok(EditorConfig::default()));
    }

    #[test]
    fn test_editor_config_rejects_bad_values() {
        for json in [r#"{ "ByteGroup": 3 }"#, r#"{ "Backup": 7 }"#, "not json"] {
            // Act
            let cfg = EditorConfig::from_json_str(json);

            // Assert
            assert_eq!(
                cfg,
                Err(HexSpliceError::AssetError(HexSpliceErrorKind::BadConfigData))
            );
        }
    }

    #[test]
    fn test_window_len_covers_a_page() {
        // Arrange
        let cfg = EngineConfig {
            max_window_len: 4,
            lines_per_page: 2,
            ..EngineConfig::default()
        };

        // Act & Assert
        assert_eq!(cfg.bytes_per_page(), 32);
        assert_eq!(cfg.window_len(), 32);
    }

    #[test]
    fn test_data_root_layout() {
        // Arrange
        let root = DataRoot::new("/app");

        // Act & Assert
        assert_eq!(root.scratch_path(), PathBuf::from("/app/Hex-Editor/Temp.bin"));
        assert_eq!(root.encodings_dir(), PathBuf::from("/app/encodings"));
    }
}
