//! The `session` module ties the stores, the navigator and the host seams together.
//!
//! [`EditorContext`] owns everything the editor needs between two key presses: the
//! active [`FileSession`], the configuration, the asset tables, the frontend and the
//! storage probe. Opening a file replaces the session; an error while opening
//! leaves the previous one untouched.

use crate::backup;
use crate::config::{EditorConfig, EngineConfig};
use crate::encoding::EncodingTable;
use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::host::{Frontend, StorageProbe, SystemStorage};
use crate::inspect::{self, Analysis};
use crate::labels::LabelTable;
use crate::mode::{Direction, EditorMode};
use crate::navigator::{Bounds, Movement, Navigator};
use crate::script::ScriptApi;
use crate::search::{self, SearchEnv, SearchType};
use crate::splice::{SpliceEngine, SpliceOp};
use crate::store::{ByteStore, Store, try_alloc};
use crate::strings::{StringTable, keys};
use crate::typed::Endianness;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const fn no_session() -> HexSpliceError {
    HexSpliceError::EditError(HexSpliceErrorKind::NoActiveSession)
}

/// State of one open file.
#[derive(Debug)]
pub struct FileSession {
    store: Store,
    navigator: Navigator,
    mode: EditorMode,
    endianness: Endianness,
    /// Set once the backup flow ran, whatever its outcome
    backup_done: bool,
}

impl FileSession {
    fn new(store: Store, navigator: Navigator) -> Self {
        Self {
            store,
            navigator,
            mode: EditorMode::Scroll,
            endianness: Endianness::default(),
            backup_done: false,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub const fn mode(&self) -> EditorMode {
        self.mode
    }

    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Range the cursor may visit: the edit window while editing a streamed file,
    /// the whole file otherwise.
    fn bounds(&self) -> Bounds {
        match self.store.window_bounds() {
            Some((lower, upper)) if self.mode.is_editing() => Bounds::new(lower, upper),
            _ => Bounds::whole(self.store.len()),
        }
    }
}

pub struct EditorContext<F: Frontend, P: StorageProbe = SystemStorage> {
    session: Option<FileSession>,
    editor: EditorConfig,
    engine: EngineConfig,
    encoding: EncodingTable,
    strings: StringTable,
    labels: LabelTable,
    frontend: F,
    probe: P,
}

impl<F: Frontend, P: StorageProbe> EditorContext<F, P> {
    pub fn new(editor: EditorConfig, engine: EngineConfig, frontend: F, probe: P) -> Self {
        Self {
            session: None,
            editor,
            engine,
            encoding: EncodingTable::default(),
            strings: StringTable::default(),
            labels: LabelTable::default(),
            frontend,
            probe,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&FileSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn editor_config(&self) -> &EditorConfig {
        &self.editor
    }

    #[must_use]
    pub const fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    #[must_use]
    pub const fn encoding(&self) -> &EncodingTable {
        &self.encoding
    }

    #[must_use]
    pub const fn strings(&self) -> &StringTable {
        &self.strings
    }

    #[must_use]
    pub const fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub const fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn set_strings(&mut self, strings: StringTable) {
        self.strings = strings;
    }

    pub fn set_encoding(&mut self, encoding: EncodingTable) {
        self.encoding = encoding;
    }

    /// Replaces the encoding table with the document at `path`. The current table
    /// stays active if the document cannot be loaded.
    ///
    /// # Errors
    /// Returns `NotFound` or `BadEncodingData`.
    pub fn load_encoding<Q: AsRef<Path>>(&mut self, path: Q) -> Result<(), HexSpliceError> {
        self.encoding.load(path)
    }

    /// # Errors
    /// Returns `NotFound` or `BadLabelData`; the current labels are kept then.
    pub fn load_labels<Q: AsRef<Path>>(&mut self, path: Q) -> Result<(), HexSpliceError> {
        self.labels = LabelTable::from_json_file(path)?;
        Ok(())
    }

    fn active(&self) -> Result<&FileSession, HexSpliceError> {
        self.session.as_ref().ok_or_else(no_session)
    }

    fn active_mut(&mut self) -> Result<&mut FileSession, HexSpliceError> {
        self.session.as_mut().ok_or_else(no_session)
    }

    fn new_session(&self, store: Store) -> FileSession {
        let mut navigator = Navigator::new(self.engine.lines_per_page);
        navigator.set_selection(self.editor.byte_group);
        FileSession::new(store, navigator)
    }

    /// Opens `path` as the active file. Pending edits of the previous file are
    /// committed or discarded as the user chooses.
    ///
    /// # Errors
    /// Returns `NotFound` or the load error of the store. The previous session is
    /// still active in that case.
    pub fn open<Q: AsRef<Path>>(&mut self, path: Q) -> Result<(), HexSpliceError> {
        let store = Store::open(path.as_ref(), &self.engine)?;
        self.finish_session()?;
        debug!("opened {} (streaming: {})", store.path().display(), store.is_streaming());
        self.session = Some(self.new_session(store));
        Ok(())
    }

    /// Creates a file holding a single zero byte at `path` and opens it.
    ///
    /// # Errors
    /// Returns `InsufficientStorage` if the destination has no room, or an I/O error
    /// if the file cannot be created.
    pub fn new_file<Q: AsRef<Path>>(&mut self, path: Q) -> Result<(), HexSpliceError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let available = self
            .probe
            .free_space(dir)
            .map_err(|e| HexSpliceError::LoadError(e.into()))?;
        if available < 1 {
            return Err(HexSpliceError::LoadError(
                HexSpliceErrorKind::InsufficientStorage {
                    op: crate::error::StorageOp::NewFile,
                    required: 1,
                    available,
                },
            ));
        }

        fs::write(path, [0u8]).map_err(|e| HexSpliceError::LoadError(e.into()))?;
        self.open(path)
    }

    /// Closes the active file, committing (`apply == true`) or discarding pending edits.
    ///
    /// # Errors
    /// Returns the error of the commit; the session stays open then.
    pub fn close(&mut self, apply: bool) -> Result<(), HexSpliceError> {
        if self.session.is_none() {
            return Ok(());
        }
        self.commit_changes(apply)?;
        self.session = None;
        Ok(())
    }

    fn finish_session(&mut self) -> Result<(), HexSpliceError> {
        let pending = self.session.as_ref().map_or(0, |s| s.store.pending_changes());
        if pending > 0 {
            let message = self.changes_made_message(pending);
            let apply = self.frontend.confirm(&message);
            self.commit_changes(apply)?;
        }
        Ok(())
    }

    /// Save prompt, with the number of edits for a streamed file. An in-memory
    /// buffer only knows that it is dirty.
    fn changes_made_message(&self, pending: usize) -> String {
        match &self.session {
            Some(session) if session.store.is_streaming() => {
                self.strings.with_counter(keys::CHANGES_MADE, pending)
            }
            _ => self.strings.lookup(keys::CHANGES_MADE),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Option<EditorMode> {
        self.session.as_ref().map(|s| s.mode)
    }

    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.store.pending_changes())
    }

    /// # Errors
    /// Returns `NoActiveSession` if no file is open.
    pub fn cursor_offset(&self) -> Result<usize, HexSpliceError> {
        Ok(self.active()?.navigator.offset())
    }

    /// # Errors
    /// Returns `NoActiveSession` if no file is open.
    pub fn set_endianness(&mut self, endianness: Endianness) -> Result<(), HexSpliceError> {
        self.active_mut()?.endianness = endianness;
        Ok(())
    }

    /// Moves the cursor one step in Scroll or Edit mode.
    ///
    /// # Errors
    /// Returns `WrongMode` in Change mode, where direction keys step the byte instead.
    pub fn move_cursor(&mut self, direction: Direction) -> Result<Movement, HexSpliceError> {
        let session = self.active_mut()?;
        if session.mode == EditorMode::Change {
            return Err(HexSpliceError::EditError(HexSpliceErrorKind::WrongMode(
                session.mode,
            )));
        }
        let bounds = session.bounds();
        Ok(session.navigator.move_cursor(direction, bounds))
    }

    /// # Errors
    /// Returns `WrongMode` in Change mode.
    pub fn move_up(&mut self) -> Result<Movement, HexSpliceError> {
        self.move_cursor(Direction::Up)
    }

    /// # Errors
    /// Returns `WrongMode` in Change mode.
    pub fn move_down(&mut self) -> Result<Movement, HexSpliceError> {
        self.move_cursor(Direction::Down)
    }

    /// # Errors
    /// Returns `WrongMode` in Change mode.
    pub fn move_left(&mut self) -> Result<Movement, HexSpliceError> {
        self.move_cursor(Direction::Left)
    }

    /// # Errors
    /// Returns `WrongMode` in Change mode.
    pub fn move_right(&mut self) -> Result<Movement, HexSpliceError> {
        self.move_cursor(Direction::Right)
    }

    /// Steps the byte under the cursor in Change mode. Returns the new value, or
    /// `None` when the step would wrap.
    ///
    /// # Errors
    /// Returns `WrongMode` outside of Change mode.
    pub fn change_byte(&mut self, direction: Direction) -> Result<Option<u8>, HexSpliceError> {
        let session = self.active_mut()?;
        if session.mode != EditorMode::Change {
            return Err(HexSpliceError::EditError(HexSpliceErrorKind::WrongMode(
                session.mode,
            )));
        }

        let offset = session.navigator.offset();
        let current = session.store.byte_at(offset)?;
        let Some(next) = direction.step(current) else {
            return Ok(None);
        };
        session.store.put_byte(offset, next)?;
        Ok(Some(next))
    }

    /// Places the cursor on `offset`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `offset` is outside the file, or outside the edit
    /// window while editing.
    pub fn jump_to(&mut self, offset: usize) -> Result<(), HexSpliceError> {
        let session = self.active_mut()?;
        let bounds = session.bounds();
        session
            .navigator
            .jump_to(offset, bounds)
            .map_err(HexSpliceError::EditError)
    }

    /// # Errors
    /// Returns `NotFound` if no label has that title, `OutOfBounds` if its offset
    /// is outside bounds.
    pub fn jump_to_label(&mut self, title: &str) -> Result<(), HexSpliceError> {
        let offset = self.labels.offset_of(title).ok_or_else(|| {
            HexSpliceError::EditError(HexSpliceErrorKind::NotFound(PathBuf::from(title)))
        })?;
        self.jump_to(offset)
    }

    /// Bytes of the current page, for the renderer.
    ///
    /// # Errors
    /// Returns `NoActiveSession` or a read error of the store.
    pub fn display_bytes(&mut self) -> Result<Vec<u8>, HexSpliceError> {
        let session = self.active_mut()?;
        let range = session.navigator.page_range(session.bounds());
        session.store.read_clamped(range.start, range.len())
    }

    /// Text column of the current page rendered through the encoding table.
    ///
    /// # Errors
    /// Returns `NoActiveSession` or a read error of the store.
    pub fn display_text(&mut self) -> Result<String, HexSpliceError> {
        let bytes = self.display_bytes()?;
        Ok(self.encoding.render(&bytes))
    }

    /// Confirm action: Scroll enters Edit (loading the window at the page origin),
    /// Edit enters Change. Change stays in Change.
    ///
    /// # Errors
    /// Returns the error of loading the edit window; the mode is unchanged then.
    pub fn confirm_action(&mut self) -> Result<EditorMode, HexSpliceError> {
        let session = self.active_mut()?;
        match session.mode {
            EditorMode::Scroll => {
                if let Store::Streaming(stream) = &mut session.store {
                    stream.open_window(session.navigator.page_origin())?;
                }
                session.mode = EditorMode::Edit;
            }
            EditorMode::Edit => session.mode = EditorMode::Change,
            EditorMode::Change => {}
        }
        Ok(session.mode)
    }

    /// Back action: Change returns to Edit. Leaving Edit with pending edits runs the
    /// backup flow, then asks whether to write the edits.
    ///
    /// # Errors
    /// Returns the error of the backup flow or the commit; the editor stays in Edit.
    pub fn back_action(&mut self) -> Result<EditorMode, HexSpliceError> {
        let mode = self.active()?.mode;
        match mode {
            EditorMode::Scroll => return Ok(EditorMode::Scroll),
            EditorMode::Change => {
                let session = self.active_mut()?;
                session.mode = EditorMode::Edit;
                return Ok(session.mode);
            }
            EditorMode::Edit => {}
        }

        let pending = self.pending_changes();
        if pending > 0 {
            self.ensure_backup()?;
            let message = self.changes_made_message(pending);
            let apply = self.frontend.confirm(&message);
            self.active_mut()?.store.commit(apply)?;
            info!("{} 0x{pending:X} changes", if apply { "wrote" } else { "discarded" });
        }

        let session = self.active_mut()?;
        if let Store::Streaming(stream) = &mut session.store {
            stream.close_window();
        }
        session.mode = EditorMode::Scroll;
        Ok(session.mode)
    }

    /// Writes (`apply == true`) or discards all pending edits. Returns how many
    /// were pending.
    ///
    /// # Errors
    /// Returns the error of the backup flow or the commit.
    pub fn commit_changes(&mut self, apply: bool) -> Result<usize, HexSpliceError> {
        let pending = self.pending_changes();
        if pending == 0 {
            return Ok(0);
        }
        if apply {
            self.ensure_backup()?;
        }
        self.active_mut()?.store.commit(apply)?;
        Ok(pending)
    }

    /// Runs the backup flow once per session.
    fn ensure_backup(&mut self) -> Result<(), HexSpliceError> {
        if self.active()?.backup_done {
            return Ok(());
        }
        self.backup()?;
        Ok(())
    }

    /// Runs the backup flow for the active file now. Returns the backup path if a
    /// copy was made. The flow counts as done for the session whatever its outcome,
    /// so a user who refused to continue without a backup is not asked again.
    ///
    /// # Errors
    /// Returns `InsufficientStorage` if the user aborts for lack of space, or an
    /// I/O error of the copy.
    pub fn backup(&mut self) -> Result<Option<PathBuf>, HexSpliceError> {
        let session = self.session.as_mut().ok_or_else(no_session)?;
        session.backup_done = true;
        backup::backup_file(
            session.store.path(),
            &self.editor,
            self.engine.chunk_size(),
            &mut self.frontend,
            &self.probe,
            &self.strings,
        )
    }

    /// Inserts `size` bytes of `fill` at `offset`. Returns `false` if the user
    /// declined.
    ///
    /// # Errors
    /// See [`EditorContext::remove`].
    pub fn insert(&mut self, offset: usize, size: usize, fill: u8) -> Result<bool, HexSpliceError> {
        self.splice(SpliceOp::Insert { offset, size, fill })
    }

    /// Removes `size` bytes at `offset`. Returns `false` if the user declined.
    ///
    /// # Errors
    /// - Returns `WrongMode` outside of Scroll mode.
    /// - Returns `PendingChanges` if a streamed file has uncommitted edits.
    /// - Returns `OutOfBounds` or `InsufficientStorage`; the file is untouched then.
    pub fn remove(&mut self, offset: usize, size: usize) -> Result<bool, HexSpliceError> {
        self.splice(SpliceOp::Remove { offset, size })
    }

    fn splice(&mut self, op: SpliceOp) -> Result<bool, HexSpliceError> {
        let session = self.active()?;
        if session.mode != EditorMode::Scroll {
            return Err(HexSpliceError::SpliceError(HexSpliceErrorKind::WrongMode(
                session.mode,
            )));
        }
        op.validate(session.store.len())?;

        if !session.store.is_streaming() {
            return self.splice_in_memory(op);
        }
        let pending = session.store.pending_changes();
        if pending > 0 {
            return Err(HexSpliceError::SpliceError(
                HexSpliceErrorKind::PendingChanges(pending),
            ));
        }

        self.ensure_backup()?;
        let engine = SpliceEngine::new(&self.engine);
        let session = self.session.as_mut().ok_or_else(no_session)?;
        let path = session.store.path().to_path_buf();
        if !engine.run(&path, op, &mut self.frontend, &self.probe, &self.strings)? {
            return Ok(false);
        }

        session.store.reload()?;
        session.navigator.reset_after_splice(session.store.len());
        Ok(true)
    }

    fn splice_in_memory(&mut self, op: SpliceOp) -> Result<bool, HexSpliceError> {
        let session = self.active_mut()?;
        let Store::InMemory(buffer) = &mut session.store else {
            return Ok(false);
        };

        match op {
            SpliceOp::Insert { offset, size, fill } => {
                let mut data = try_alloc(size).map_err(HexSpliceError::SpliceError)?;
                data.fill(fill);
                buffer.insert_bytes(offset, &data)?;
            }
            SpliceOp::Remove { offset, size } => buffer.erase_bytes(offset, size)?,
        }
        debug!("{op:?} applied in memory");

        let len = buffer.len();
        session.navigator.reset_after_splice(len);
        Ok(true)
    }

    /// Searches `[start, start + size)`, clipped to the file, or to the edit
    /// window while editing.
    ///
    /// # Errors
    /// Returns `InvalidPattern`, `ScanRangeTooLarge` or a read error of the store.
    pub fn search(
        &mut self,
        start: usize,
        size: usize,
        search_type: &SearchType,
    ) -> Result<Vec<usize>, HexSpliceError> {
        let Self {
            session,
            engine,
            encoding,
            strings,
            frontend,
            ..
        } = self;
        let session = session.as_mut().ok_or_else(no_session)?;

        let bounds = session.bounds();
        let lower = start.max(bounds.lower);
        let upper = start.saturating_add(size).min(bounds.upper);
        let resident_limit = session.store.is_streaming().then(|| engine.window_len());

        let mut env = SearchEnv {
            frontend,
            strings,
            encoding,
            chunk_size: engine.chunk_size(),
            resident_limit,
        };
        search::search(&mut session.store, lower..upper.max(lower), search_type, &mut env)
    }

    /// Copies the active file to `dest` and continues the session on the copy.
    /// Both stores need free space of twice the file size at `dest`.
    ///
    /// # Errors
    /// - Returns `PendingChanges` if a streamed file has uncommitted edits.
    /// - Returns `InsufficientStorage` or an I/O error of the copy.
    pub fn save_as<Q: AsRef<Path>>(&mut self, dest: Q) -> Result<(), HexSpliceError> {
        let dest = dest.as_ref();
        let session = self.session.as_mut().ok_or_else(no_session)?;

        match &session.store {
            Store::InMemory(buffer) => {
                backup::check_save_space(
                    dest,
                    u64::try_from(buffer.len()).unwrap_or(u64::MAX),
                    &mut self.frontend,
                    &self.probe,
                    &self.strings,
                )?;
                if !buffer.write_back(dest) {
                    return Err(HexSpliceError::EditError(HexSpliceErrorKind::Io(
                        std::io::ErrorKind::Other,
                    )));
                }
            }
            Store::Streaming(stream) => {
                let pending = stream.changes().len();
                if pending > 0 {
                    return Err(HexSpliceError::EditError(
                        HexSpliceErrorKind::PendingChanges(pending),
                    ));
                }
                backup::save_as(
                    stream.path(),
                    dest,
                    self.engine.chunk_size(),
                    &mut self.frontend,
                    &self.probe,
                    &self.strings,
                )?;
            }
        }

        let store = Store::open(dest, &self.engine)?;
        let navigator = session.navigator.clone();
        let endianness = session.endianness;
        let mut next = FileSession::new(store, navigator);
        next.endianness = endianness;
        self.session = Some(next);
        Ok(())
    }

    /// Typed view of the selected bytes at the cursor.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the selection runs past the end of the file.
    pub fn analyze(&mut self) -> Result<Analysis, HexSpliceError> {
        let session = self.active_mut()?;
        let offset = session.navigator.offset();
        let width = session.navigator.selection().width();
        inspect::analyze(&mut session.store, offset, width, session.endianness)
    }

    /// Scripting surface over the active store.
    ///
    /// # Errors
    /// Returns `NoActiveSession` if no file is open.
    pub fn script(&mut self) -> Result<ScriptApi<'_, Store>, HexSpliceError> {
        Ok(ScriptApi::new(&mut self.active_mut()?.store))
    }
}
