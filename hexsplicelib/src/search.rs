//! Pattern search over a byte store, and byte-wise file comparison.
//!
//! Byte patterns use a naive sliding-window scan that reads the store in bounded
//! chunks and polls the frontend for cancellation before every candidate offset.
//! A cancelled scan returns the matches found so far.

use crate::encoding::EncodingTable;
use crate::error::{HexSpliceError, HexSpliceErrorKind};
use crate::host::Frontend;
use crate::store::ByteStore;
use crate::strings::{StringTable, keys};
use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchType {
    /// Raw byte sequence
    Hex(Vec<u8>),
    /// Text mapped to bytes through the active encoding table
    Encoded(String),
    /// Regular expression over resident bytes only
    Regex(String),
}

/// Everything a search needs besides the store itself.
pub struct SearchEnv<'a, F: Frontend + ?Sized> {
    pub frontend: &'a mut F,
    pub strings: &'a StringTable,
    pub encoding: &'a EncodingTable,
    /// Candidates scanned per store read
    pub chunk_size: usize,
    /// Largest range a regex may scan, `None` for no limit
    pub resident_limit: Option<usize>,
}

/// Searches `range` of `store` for `search_type`.
/// Returns the absolute start offsets of all matches, in ascending order.
///
/// # Errors
/// - Returns `InvalidPattern` if a regex does not compile.
/// - Returns `ScanRangeTooLarge` if a regex range exceeds the resident limit.
/// - Returns any read error of the store.
pub fn search<S, F>(
    store: &mut S,
    range: Range<usize>,
    search_type: &SearchType,
    env: &mut SearchEnv<'_, F>,
) -> Result<Vec<usize>, HexSpliceError>
where
    S: ByteStore + ?Sized,
    F: Frontend + ?Sized,
{
    let matches = match search_type {
        SearchType::Hex(pattern) => search_bytes(store, range, pattern, env)?,
        SearchType::Encoded(text) => {
            let pattern = env.encoding.encode(text);
            search_bytes(store, range, &pattern, env)?
        }
        SearchType::Regex(pattern) => search_regex(store, range, pattern, env.resident_limit)?,
    };

    if matches.is_empty() {
        env.frontend.status(&env.strings.lookup(keys::NO_RESULTS_FOUND));
    }
    Ok(matches)
}

/// Naive scan for `pattern` within `range`. A match must fit entirely inside the
/// range. Empty patterns never match.
///
/// # Errors
/// Returns any read error of the store.
pub fn search_bytes<S, F>(
    store: &mut S,
    range: Range<usize>,
    pattern: &[u8],
    env: &mut SearchEnv<'_, F>,
) -> Result<Vec<usize>, HexSpliceError>
where
    S: ByteStore + ?Sized,
    F: Frontend + ?Sized,
{
    let size = pattern.len();
    let end = range.end.min(store.len());
    let start = range.start;
    if size == 0 || start >= end || size > end - start {
        return Ok(vec![]);
    }

    let last = end - size; // last candidate start
    let chunk = env.chunk_size.max(1);
    let mut matches = Vec::new();
    let mut pos = start;

    while pos <= last {
        let candidates_end = (pos + chunk).min(last + 1);
        let data = store
            .read_clamped(pos, candidates_end - pos + size - 1)
            .map_err(|e| HexSpliceError::SearchError(e.into_kind()))?;

        for candidate in pos..candidates_end {
            if env.frontend.cancel_requested() {
                debug!("search cancelled at 0x{candidate:X}");
                return Ok(matches);
            }
            let rel = candidate - pos;
            if data[rel..rel + size] == *pattern {
                matches.push(candidate);
            }
        }

        env.frontend
            .show_progress(&env.strings.with_counter(keys::SEARCH_MATCHES, candidates_end));
        pos = candidates_end;
    }

    Ok(matches)
}

/// Regex search over `range`, which is read into memory whole.
///
/// # Errors
/// - Returns `InvalidPattern` if the regex does not compile.
/// - Returns `ScanRangeTooLarge` if the range exceeds `limit`.
pub fn search_regex<S>(
    store: &mut S,
    range: Range<usize>,
    pattern: &str,
    limit: Option<usize>,
) -> Result<Vec<usize>, HexSpliceError>
where
    S: ByteStore + ?Sized,
{
    let re = Regex::new(pattern).map_err(|e| {
        HexSpliceError::SearchError(HexSpliceErrorKind::InvalidPattern(e.to_string()))
    })?;

    let end = range.end.min(store.len());
    let len = end.saturating_sub(range.start);
    if limit.is_some_and(|limit| len > limit) {
        return Err(HexSpliceError::SearchError(
            HexSpliceErrorKind::ScanRangeTooLarge(len),
        ));
    }

    let data = store
        .read_clamped(range.start, len)
        .map_err(|e| HexSpliceError::SearchError(e.into_kind()))?;
    Ok(re
        .find_iter(&data)
        .map(|m| range.start + m.start())
        .collect())
}

/// Byte that differs between two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difference {
    pub offset: usize,
    pub left: u8,
    pub right: u8,
}

/// Compares two files byte by byte up to the shorter length, reading both in
/// chunks of `chunk_size`.
///
/// # Errors
/// Returns `NotFound` if either file is missing or an I/O error if a read fails.
pub fn compare_files<A, B>(
    path_a: A,
    path_b: B,
    chunk_size: usize,
) -> Result<Vec<Difference>, HexSpliceError>
where
    A: AsRef<Path>,
    B: AsRef<Path>,
{
    let open = |path: &Path| -> Result<(File, u64), HexSpliceError> {
        let err = |e: &std::io::Error| HexSpliceError::SearchError(HexSpliceErrorKind::from_io(e, path));
        let file = File::open(path).map_err(|e| err(&e))?;
        let len = file.metadata().map_err(|e| err(&e))?.len();
        Ok((file, len))
    };
    let (mut file_a, len_a) = open(path_a.as_ref())?;
    let (mut file_b, len_b) = open(path_b.as_ref())?;

    let chunk = chunk_size.max(1);
    let mut buf_a = vec![0u8; chunk];
    let mut buf_b = vec![0u8; chunk];
    let mut remaining = usize::try_from(len_a.min(len_b)).unwrap_or(usize::MAX);
    let mut offset = 0;
    let mut diffs = Vec::new();

    while remaining > 0 {
        let n = remaining.min(chunk);
        file_a
            .read_exact(&mut buf_a[..n])
            .and_then(|()| file_b.read_exact(&mut buf_b[..n]))
            .map_err(|e| HexSpliceError::SearchError(e.into()))?;

        diffs.extend(
            buf_a[..n]
                .iter()
                .zip(&buf_b[..n])
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(idx, (&left, &right))| Difference {
                    offset: offset + idx,
                    left,
                    right,
                }),
        );

        offset += n;
        remaining -= n;
    }

    Ok(diffs)
}
