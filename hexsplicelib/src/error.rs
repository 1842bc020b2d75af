//! The `error` module defines [`HexSpliceError`], the error type returned by every
//! fallible operation of the editing engine.
//! It carries two pieces of information:
//! 1. Where the error occurs, e.g., while loading a file or while splicing it.
//! 2. What kind of error was encountered (via [`HexSpliceErrorKind`]).

use crate::mode::EditorMode;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexSpliceError {
    LoadError(HexSpliceErrorKind),
    EditError(HexSpliceErrorKind),
    SpliceError(HexSpliceErrorKind),
    SearchError(HexSpliceErrorKind),
    ScriptError(HexSpliceErrorKind),
    AssetError(HexSpliceErrorKind),
}

impl HexSpliceError {
    /// Returns the kind of the error, regardless of where it occurred.
    #[must_use]
    pub const fn kind(&self) -> &HexSpliceErrorKind {
        match self {
            Self::LoadError(kind)
            | Self::EditError(kind)
            | Self::SpliceError(kind)
            | Self::SearchError(kind)
            | Self::ScriptError(kind)
            | Self::AssetError(kind) => kind,
        }
    }

    /// Consumes the error and returns its kind.
    #[must_use]
    pub fn into_kind(self) -> HexSpliceErrorKind {
        match self {
            Self::LoadError(kind)
            | Self::EditError(kind)
            | Self::SpliceError(kind)
            | Self::SearchError(kind)
            | Self::ScriptError(kind)
            | Self::AssetError(kind) => kind,
        }
    }
}

impl fmt::Display for HexSpliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadError(base_err) => {
                write!(f, "Error encountered while loading the file:\n{base_err}")
            }
            Self::EditError(base_err) => {
                write!(f, "Error encountered while editing the file:\n{base_err}")
            }
            Self::SpliceError(base_err) => {
                write!(f, "Error encountered while splicing the file:\n{base_err}")
            }
            Self::SearchError(base_err) => {
                write!(f, "Error encountered while searching:\n{base_err}")
            }
            Self::ScriptError(base_err) => {
                write!(f, "Script error:\n{base_err}")
            }
            Self::AssetError(base_err) => {
                write!(f, "Error encountered while loading an asset:\n{base_err}")
            }
        }
    }
}

/// Destructive operation that ran out of free storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Insert,
    Remove,
    Backup,
    Save,
    NewFile,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Backup => "backup",
            Self::Save => "save",
            Self::NewFile => "new file",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexSpliceErrorKind {
    /// Path does not exist
    NotFound(PathBuf),
    /// Buffer of the given size could not be allocated
    AllocationFailure(usize),
    /// Range `[offset, offset + size)` exceeds the data of length `len`
    OutOfBounds {
        offset: usize,
        size: usize,
        len: usize,
    },
    /// Not enough free storage to run the operation
    InsufficientStorage {
        op: StorageOp,
        required: u64,
        available: u64,
    },
    /// Encoding table document is malformed
    BadEncodingData,
    /// Label document is malformed
    BadLabelData,
    /// String table document is malformed
    BadStringData,
    /// Editor config document is malformed
    BadConfigData,
    /// Bit index above 7
    InvalidBitIndex(u8),
    /// Nibble value above 15
    InvalidNibbleValue(u8),
    /// Unknown scalar type name
    InvalidType(String),
    /// Search pattern could not be compiled
    InvalidPattern(String),
    /// Range too large to be scanned from memory
    ScanRangeTooLarge(usize),
    /// Operation is not allowed in the current mode
    WrongMode(EditorMode),
    /// Operation requires the change map to be committed or discarded first
    PendingChanges(usize),
    /// No file is open
    NoActiveSession,
    /// Underlying I/O failure
    Io(io::ErrorKind),
}

impl HexSpliceErrorKind {
    /// Maps an I/O error on `path` to a kind, keeping missing files distinct.
    pub fn from_io(err: &io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.into())
        } else {
            Self::Io(err.kind())
        }
    }
}

impl From<io::Error> for HexSpliceErrorKind {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl fmt::Display for HexSpliceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "File not found: {}", path.display())
            }
            Self::AllocationFailure(size) => {
                write!(f, "Failed to allocate 0x{size:X} bytes")
            }
            Self::OutOfBounds { offset, size, len } => {
                write!(
                    f,
                    "Range 0x{offset:X}..+0x{size:X} is out of bounds for data of length 0x{len:X}"
                )
            }
            Self::InsufficientStorage {
                op,
                required,
                available,
            } => {
                write!(
                    f,
                    "Not enough free space to {op}: required {required} bytes, available {available} bytes"
                )
            }
            Self::BadEncodingData => {
                write!(f, "Encoding data is malformed")
            }
            Self::BadLabelData => {
                write!(f, "Label data is malformed")
            }
            Self::BadStringData => {
                write!(f, "String table data is malformed")
            }
            Self::BadConfigData => {
                write!(f, "Config data is malformed")
            }
            Self::InvalidBitIndex(idx) => {
                write!(f, "Bit index {idx} is not in range 0..=7")
            }
            Self::InvalidNibbleValue(value) => {
                write!(f, "Nibble value 0x{value:X} is not in range 0x0..=0xF")
            }
            Self::InvalidType(name) => {
                write!(f, "'{name}' is not a valid type")
            }
            Self::InvalidPattern(reason) => {
                write!(f, "Invalid search pattern: {reason}")
            }
            Self::ScanRangeTooLarge(size) => {
                write!(f, "Range of 0x{size:X} bytes is too large to scan in memory")
            }
            Self::WrongMode(mode) => {
                write!(f, "Operation is not available in {mode} mode")
            }
            Self::PendingChanges(count) => {
                write!(f, "{count} pending change(s) must be saved or discarded first")
            }
            Self::NoActiveSession => {
                write!(f, "No file is open")
            }
            Self::Io(kind) => {
                write!(f, "I/O failure: {kind}")
            }
        }
    }
}

impl Error for HexSpliceError {}
impl Error for HexSpliceErrorKind {}
