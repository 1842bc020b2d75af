//! The `splice` module inserts or removes byte ranges in files that are never
//! loaded whole.
//!
//! A splice rebuilds the file in a reserved scratch file in three bounded passes:
//! 1. Copy `[0, offset)` from the source.
//! 2. Insert only: append `size` copies of the fill byte.
//! 3. Copy the tail: `[offset, len)` for an insert, `[offset + size, len)` for a remove.
//!
//! The original file is not touched until the finished scratch file is renamed
//! over it. If the scratch file lives on another file system it is first copied
//! next to the target and renamed from there.
//!
//! Once the first pass has started the splice runs to completion. The only
//! cancellation point is the confirmation prompt before any I/O.

use crate::config::EngineConfig;
use crate::error::{HexSpliceError, HexSpliceErrorKind, StorageOp};
use crate::host::{Frontend, StorageProbe};
use crate::strings::{StringTable, keys};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Structural edit of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceOp {
    Insert { offset: usize, size: usize, fill: u8 },
    Remove { offset: usize, size: usize },
}

impl SpliceOp {
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Insert { offset, .. } | Self::Remove { offset, .. } => offset,
        }
    }

    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Insert { size, .. } | Self::Remove { size, .. } => size,
        }
    }

    #[must_use]
    pub const fn storage_op(self) -> StorageOp {
        match self {
            Self::Insert { .. } => StorageOp::Insert,
            Self::Remove { .. } => StorageOp::Remove,
        }
    }

    /// Length of the file after applying the splice to a file of `original` bytes.
    #[must_use]
    pub const fn result_len(self, original: usize) -> usize {
        match self {
            Self::Insert { size, .. } => original + size,
            Self::Remove { size, .. } => original - size,
        }
    }

    /// Free space required to splice a file of `original` bytes: the scratch copy
    /// plus headroom for the original, i.e. `2 * original + size` for an insert and
    /// `2 * original - size` for a remove.
    #[must_use]
    pub const fn required_space(self, original: u64) -> u64 {
        match self {
            Self::Insert { size, .. } => original
                .saturating_mul(2)
                .saturating_add(size as u64),
            Self::Remove { size, .. } => original
                .saturating_mul(2)
                .saturating_sub(size as u64),
        }
    }

    /// Checks the splice against a file of `len` bytes.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if an insert starts past the end or a removed range
    /// extends past it.
    pub fn validate(self, len: usize) -> Result<(), HexSpliceError> {
        let fits = match self {
            Self::Insert { offset, size, .. } => {
                offset <= len && len.checked_add(size).is_some()
            }
            Self::Remove { offset, size } => offset.checked_add(size).is_some_and(|end| end <= len),
        };
        if fits {
            Ok(())
        } else {
            Err(HexSpliceError::SpliceError(HexSpliceErrorKind::OutOfBounds {
                offset: self.offset(),
                size: self.size(),
                len,
            }))
        }
    }

    const fn space_key(self) -> &'static str {
        match self {
            Self::Insert { .. } => keys::NOT_ENOUGH_SPACE_INSERT,
            Self::Remove { .. } => keys::NOT_ENOUGH_SPACE_REMOVE,
        }
    }

    const fn warning_key(self) -> &'static str {
        match self {
            Self::Insert { .. } => keys::INSERT_WARNING,
            Self::Remove { .. } => keys::REMOVE_WARNING,
        }
    }
}

/// Pass of a running splice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Head,
    Fill,
    Tail,
}

impl Pass {
    const fn progress_key(self, op: SpliceOp) -> &'static str {
        match (op, self) {
            (SpliceOp::Insert { .. }, Self::Head) => keys::INSERT_STEP_1,
            (SpliceOp::Insert { .. }, Self::Fill) => keys::INSERT_STEP_2,
            (SpliceOp::Insert { .. }, Self::Tail) => keys::INSERT_STEP_3,
            (SpliceOp::Remove { .. }, Self::Head | Self::Fill) => keys::REMOVE_STEP_1,
            (SpliceOp::Remove { .. }, Self::Tail) => keys::REMOVE_STEP_2,
        }
    }
}

/// Writes the spliced form of `src` (holding `src_len` bytes) to `dst`, using
/// chunks of at most `buffer_size` bytes. `progress` receives the bytes left in
/// the current pass after every chunk.
///
/// # Errors
/// Returns any I/O error of the source or destination.
pub fn splice_stream<R, W, P>(
    src: &mut R,
    src_len: usize,
    dst: &mut W,
    op: SpliceOp,
    buffer_size: usize,
    mut progress: P,
) -> io::Result<()>
where
    R: Read + Seek,
    W: Write,
    P: FnMut(Pass, usize),
{
    let buffer_size = buffer_size.max(1);
    let mut buf = vec![0u8; buffer_size.min(src_len.max(op.size()).max(1))];
    let offset = op.offset();

    // Pass 1: [0, offset)
    let mut remaining = offset;
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        src.seek(SeekFrom::Start((offset - remaining) as u64))?;
        src.read_exact(&mut buf[..chunk])?;
        dst.write_all(&buf[..chunk])?;
        remaining -= chunk;
        progress(Pass::Head, remaining);
    }

    // Pass 2: filler
    let tail_start = match op {
        SpliceOp::Insert { size, fill, .. } => {
            buf.fill(fill);
            let mut remaining = size;
            while remaining > 0 {
                let chunk = remaining.min(buf.len());
                dst.write_all(&buf[..chunk])?;
                remaining -= chunk;
                progress(Pass::Fill, remaining);
            }
            offset
        }
        SpliceOp::Remove { size, .. } => offset + size,
    };

    // Pass 3: [tail_start, src_len)
    let mut remaining = src_len - tail_start;
    src.seek(SeekFrom::Start(tail_start as u64))?;
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        src.read_exact(&mut buf[..chunk])?;
        dst.write_all(&buf[..chunk])?;
        remaining -= chunk;
        progress(Pass::Tail, remaining);
    }

    dst.flush()
}

/// Runs splices against files on disk through the reserved scratch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceEngine {
    pub buffer_size: usize,
    pub scratch_path: PathBuf,
}

impl SpliceEngine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            buffer_size: config.chunk_size(),
            scratch_path: config.scratch_path.clone(),
        }
    }

    /// Applies `op` to the file at `target`.
    ///
    /// Checks bounds and free space, asks the user to confirm, then rebuilds the
    /// file. Returns `Ok(false)` when the user declines, in which case no file was
    /// touched.
    ///
    /// # Errors
    /// - Returns `OutOfBounds` if the op does not fit the file.
    /// - Returns `InsufficientStorage` if free space is below
    ///   [`SpliceOp::required_space`].
    /// - Returns an I/O error if a pass or the final rename fails. The original file
    ///   is intact in all of these cases.
    pub fn run<F, S>(
        &self,
        target: &Path,
        op: SpliceOp,
        frontend: &mut F,
        probe: &S,
        strings: &StringTable,
    ) -> Result<bool, HexSpliceError>
    where
        F: Frontend + ?Sized,
        S: StorageProbe + ?Sized,
    {
        let err = |kind: HexSpliceErrorKind| HexSpliceError::SpliceError(kind);

        let src_len = fs::metadata(target)
            .map_err(|e| err(HexSpliceErrorKind::from_io(&e, target)))?
            .len();
        let src_len_usize = usize::try_from(src_len)
            .map_err(|_| err(HexSpliceErrorKind::AllocationFailure(usize::MAX)))?;
        op.validate(src_len_usize)?;

        let scratch_dir = parent_dir(&self.scratch_path);
        fs::create_dir_all(scratch_dir).map_err(|e| err(e.into()))?;

        let required = op.required_space(src_len);
        let available = probe
            .free_space(scratch_dir)
            .map_err(|e| err(e.into()))?;
        if available < required {
            frontend.status(&strings.lookup(op.space_key()));
            return Err(err(HexSpliceErrorKind::InsufficientStorage {
                op: op.storage_op(),
                required,
                available,
            }));
        }

        if !frontend.confirm(&strings.lookup(op.warning_key())) {
            debug!("{op:?} declined");
            return Ok(false);
        }

        debug!("{op:?} on {} via {}", target.display(), self.scratch_path.display());
        self.write_scratch(target, src_len_usize, op, frontend, strings)
            .map_err(|e| err(e.into()))?;
        replace_file(&self.scratch_path, target).map_err(|e| err(e.into()))?;

        info!(
            "spliced {}: 0x{src_len:X} -> 0x{:X} bytes",
            target.display(),
            op.result_len(src_len_usize)
        );
        Ok(true)
    }

    fn write_scratch<F>(
        &self,
        target: &Path,
        src_len: usize,
        op: SpliceOp,
        frontend: &mut F,
        strings: &StringTable,
    ) -> io::Result<()>
    where
        F: Frontend + ?Sized,
    {
        let mut src = File::open(target)?;
        let scratch = File::create(&self.scratch_path)?;
        let mut dst = BufWriter::with_capacity(self.buffer_size, scratch);

        splice_stream(&mut src, src_len, &mut dst, op, self.buffer_size, |pass, left| {
            frontend.show_progress(&strings.with_counter(pass.progress_key(op), left));
        })?;

        let scratch = dst.into_inner().map_err(io::IntoInnerError::into_error)?;
        scratch.sync_all()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Moves `scratch` over `target`. The target is only ever replaced by a rename.
fn replace_file(scratch: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(scratch, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Different file systems: stage a copy beside the target first.
            let mut staged = target.as_os_str().to_owned();
            staged.push(".splice");
            let staged = PathBuf::from(staged);
            warn!(
                "rename from scratch failed ({rename_err}), staging at {}",
                staged.display()
            );

            fs::copy(scratch, &staged)?;
            if let Err(e) = fs::rename(&staged, target) {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
            let _ = fs::remove_file(scratch);
            Ok(())
        }
    }
}
