//! # `hexsplicelib`
//!
//! `hexsplicelib` is the engine of a byte-level hex editor that works on files far
//! larger than the memory available to it.
//!
//! The library provides:
//! - Two backing stores behind the [`ByteStore`] contract: the in-memory
//!   [`ByteBuffer`] and the [`StreamingStore`], which keeps edits in a change map
//!   and pulls a bounded edit window into memory.
//! - Cursor and viewport arithmetic (via [`Navigator`]).
//! - Out-of-place insert and remove of byte ranges in three bounded passes
//!   (via [`SpliceEngine`]).
//! - Byte, text and regex search, plus a chunked file comparison.
//! - [`EditorContext`], which ties the above into the Scroll / Edit / Change editor.
//! - Error handling with [`HexSpliceError`].
//!
//! ## Example
//!
//! ```
//! use hexsplicelib::{AutoFrontend, EditorConfig, EditorContext, EngineConfig, SystemStorage};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("data.bin");
//! std::fs::write(&path, [0x10, 0x20, 0x30]).unwrap();
//!
//! let mut ctx = EditorContext::new(
//!     EditorConfig::default(),
//!     EngineConfig::default(),
//!     AutoFrontend::accept(),
//!     SystemStorage,
//! );
//! ctx.open(&path).unwrap();
//! ctx.jump_to(2).unwrap();
//! assert_eq!(ctx.display_bytes().unwrap(), vec![0x10, 0x20, 0x30]);
//! assert_eq!(ctx.cursor_offset().unwrap(), 2);
//! ```

mod backup;
mod changes;
mod config;
mod encoding;
mod error;
mod host;
mod inspect;
mod labels;
mod memory;
mod mode;
mod navigator;
mod script;
mod search;
mod session;
mod splice;
mod store;
mod stream;
mod strings;
mod typed;

// Public APIs
pub use backup::{backup_file, backup_path_for, check_save_space, copy_chunked, save_as};
pub use changes::ChangeMap;
pub use config::{
    BackupPolicy, ByteGroup, DEFAULT_BUFFER_SIZE, DEFAULT_IN_MEMORY_LIMIT,
    DEFAULT_LINES_PER_PAGE, DEFAULT_MAX_WINDOW_LEN, DataRoot, EditorConfig, EngineConfig,
    StoreStrategy, ViewMode,
};
pub use encoding::EncodingTable;
pub use error::{HexSpliceError, HexSpliceErrorKind, StorageOp};
pub use host::{AutoFrontend, FixedStorage, Frontend, StorageProbe, SystemStorage};
pub use inspect::{Analysis, analyze, format_with_separators};
pub use labels::{Label, LabelTable};
pub use memory::ByteBuffer;
pub use mode::{Direction, EditorMode};
pub use navigator::{BYTES_PER_ROW, Bounds, Movement, Navigator};
pub use script::ScriptApi;
pub use search::{
    Difference, SearchEnv, SearchType, compare_files, search, search_bytes, search_regex,
};
pub use session::{EditorContext, FileSession};
pub use splice::{Pass, SpliceEngine, SpliceOp, splice_stream};
pub use store::{ByteStore, Store};
pub use stream::{EditWindow, StreamingStore};
pub use strings::{StringTable, keys};
pub use typed::{Endianness, Primitive, ScalarType};
