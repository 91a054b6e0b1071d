use crate::decode;
use crate::error::{DecodeError, Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Upper bound on bytes read from a single sysfs attribute.
pub const MAX_SYSFS_FILE_SIZE: u64 = 4096;

/// Upper bound for the few procfs text files that outgrow a page (`/proc/cpuinfo`).
pub const MAX_PROC_FILE_SIZE: u64 = 256 * 1024;

/// Check an untrusted directory-entry name before it becomes part of a path.
/// Only `[A-Za-z0-9-_:.]` is allowed, and `..` is refused outright.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation {
            name: name.to_string(),
            reason: "empty name",
        });
    }
    if name.contains("..") || name.contains('/') {
        return Err(Error::Validation {
            name: name.to_string(),
            reason: "path traversal",
        });
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'));
    if !valid {
        return Err(Error::Validation {
            name: name.to_string(),
            reason: "invalid character",
        });
    }
    Ok(())
}

/// Abstraction over sysfs/procfs filesystem root.
/// Defaults to `/` in production, redirectable to a temp directory for testing.
#[derive(Debug, Clone)]
pub struct SysfsRoot {
    root: PathBuf,
    opened: Arc<AtomicUsize>,
}

impl Default for SysfsRoot {
    fn default() -> Self {
        Self::new("/")
    }
}

impl SysfsRoot {
    /// Create a SysfsRoot pointing at the real system.
    pub fn system() -> Self {
        Self::default()
    }

    /// Create a SysfsRoot pointing at a custom directory (for testing).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolve a path relative to this root.
    /// e.g., `path("sys/class/power_supply")` -> `/sys/class/power_supply` or `<test_root>/sys/class/power_supply`
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Number of files this root (and its clones) has tried to open.
    pub fn files_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Join a validated entry name onto a relative directory.
    pub fn child(&self, dir: &str, name: &str) -> Result<String> {
        validate_name(name)?;
        Ok(format!("{}/{}", dir, name))
    }

    /// Read a sysfs attribute, at most [`MAX_SYSFS_FILE_SIZE`] bytes, trimming whitespace.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<String> {
        self.read_limited(relative, MAX_SYSFS_FILE_SIZE)
    }

    /// Bounded read with a caller-chosen ceiling. Content past `limit` is never read.
    pub fn read_limited(&self, relative: impl AsRef<Path>, limit: u64) -> Result<String> {
        let path = self.path(relative);
        self.opened.fetch_add(1, Ordering::Relaxed);
        let file = File::open(&path).map_err(|e| Error::from_io(path.clone(), e))?;
        let mut buf = Vec::new();
        file.take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| Error::from_io(path.clone(), e))?;
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }

    /// Read a sysfs file, returning None if it doesn't exist.
    pub fn read_optional(&self, relative: impl AsRef<Path>) -> Result<Option<String>> {
        match self.read(relative) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a required attribute and decode it.
    pub fn read_with<T>(
        &self,
        relative: impl AsRef<Path>,
        decode: impl FnOnce(&str) -> std::result::Result<T, DecodeError>,
    ) -> Result<T> {
        let relative = relative.as_ref();
        let value = self.read(relative)?;
        decode(&value).map_err(|source| Error::Parse {
            path: self.path(relative),
            source,
        })
    }

    /// Read an optional attribute and decode it. A missing file or undecodable
    /// content yields `None`; other I/O failures are still returned.
    pub fn read_optional_with<T>(
        &self,
        relative: impl AsRef<Path>,
        decode: impl FnOnce(&str) -> std::result::Result<T, DecodeError>,
    ) -> Result<Option<T>> {
        let relative = relative.as_ref();
        let Some(value) = self.read_optional(relative)? else {
            return Ok(None);
        };
        match decode(&value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::debug!(path = %self.path(relative).display(), error = %e, "ignoring optional attribute");
                Ok(None)
            }
        }
    }

    /// Read an attribute that is never fatal to its caller. Any failure, I/O
    /// included, is logged at debug and reported as absent.
    pub fn read_lenient<T>(
        &self,
        relative: impl AsRef<Path>,
        decode: impl FnOnce(&str) -> std::result::Result<T, DecodeError>,
    ) -> Option<T> {
        let relative = relative.as_ref();
        match self.read_optional_with(relative, decode) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable optional attribute");
                None
            }
        }
    }

    /// Lenient read of a free-text attribute; empty text is absent.
    pub fn read_lenient_text(&self, relative: impl AsRef<Path>) -> Option<String> {
        self.read_lenient(relative, |v| Ok(decode::as_optional_string(v)))
            .flatten()
    }

    /// Read a sysfs file and parse it as an integer.
    pub fn read_int<T: std::str::FromStr>(&self, relative: impl AsRef<Path>) -> Result<T> {
        self.read_with(relative, decode::as_int)
    }

    /// List entries in a sysfs directory.
    pub fn list_dir(&self, relative: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = self.path(relative);
        let entries = std::fs::read_dir(&path).map_err(|e| Error::from_io(path.clone(), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::from_io(path.clone(), e))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// List a directory, dropping every entry whose name fails [`validate_name`].
    pub fn list_names(&self, relative: impl AsRef<Path>) -> Result<Vec<String>> {
        let relative = relative.as_ref();
        let names = self.list_dir(relative)?;
        Ok(names
            .into_iter()
            .filter(|name| match validate_name(name) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(dir = %relative.display(), error = %e, "skipping entry");
                    false
                }
            })
            .collect())
    }

    /// Check if a path exists relative to this root.
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path(relative).exists()
    }

    /// Check if a path is a directory (following symlinks, as sysfs class links need).
    pub fn is_dir(&self, relative: impl AsRef<Path>) -> bool {
        self.path(relative).is_dir()
    }

    /// Final component of a symlink target, e.g. the driver name behind `device/driver`.
    pub fn link_name(&self, relative: impl AsRef<Path>) -> Option<String> {
        let target = std::fs::read_link(self.path(relative)).ok()?;
        target.file_name()?.to_str().map(String::from)
    }
}
