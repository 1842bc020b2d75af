//! Seams to the host application: user prompts, progress display, the polled
//! cancel signal and the free-space query.

use std::io;
use std::path::Path;

/// User-facing side of long-running and destructive operations.
pub trait Frontend {
    /// Asks the user to confirm `message`. Declining aborts the operation.
    fn confirm(&mut self, message: &str) -> bool;

    /// Reports progress of a long loop. Must not block.
    fn show_progress(&mut self, message: &str);

    /// Shows a short status notice (errors, "no results", ...).
    fn status(&mut self, message: &str);

    /// Polled once per iteration by cancellable loops.
    fn cancel_requested(&mut self) -> bool {
        false
    }
}

/// Answers every prompt with a fixed value and drops all output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoFrontend {
    pub answer: bool,
}

impl AutoFrontend {
    #[must_use]
    pub const fn accept() -> Self {
        Self { answer: true }
    }

    #[must_use]
    pub const fn decline() -> Self {
        Self { answer: false }
    }
}

impl Frontend for AutoFrontend {
    fn confirm(&mut self, _message: &str) -> bool {
        self.answer
    }

    fn show_progress(&mut self, _message: &str) {}

    fn status(&mut self, _message: &str) {}
}

/// Free space query for the storage holding `dir`.
pub trait StorageProbe {
    /// # Errors
    /// Returns an I/O error if the storage cannot be queried.
    fn free_space(&self, dir: &Path) -> io::Result<u64>;
}

/// Queries the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStorage;

impl StorageProbe for SystemStorage {
    #[cfg(unix)]
    #[allow(clippy::unnecessary_cast, clippy::useless_conversion)]
    fn free_space(&self, dir: &Path) -> io::Result<u64> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(dir.as_os_str().as_bytes())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a
        // zero-initialised plain C struct that statvfs fills in.
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &raw mut stat) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
    }

    #[cfg(not(unix))]
    fn free_space(&self, _dir: &Path) -> io::Result<u64> {
        Ok(u64::MAX)
    }
}

/// Reports a fixed amount of free space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStorage(pub u64);

impl StorageProbe for FixedStorage {
    fn free_space(&self, _dir: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}
