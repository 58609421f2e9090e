//! Filesystem capability used by the resolver and the cache.
//!
//! The [`Filesystem`] trait is the only way the crate touches disk, so tests
//! can swap in an in-memory implementation with a controllable clock. The
//! production implementation is [`LocalFs`].
//!
//! ## Atomic writes
//!
//! [`LocalFs::write`] writes into a temporary file created in the target's
//! own directory and renames it over the target. Concurrent renders racing
//! to regenerate the same artifact therefore never expose a half-written
//! file; the last rename wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// Permissions applied to every generated artifact.
pub const ARTIFACT_MODE: u32 = 0o644;

/// Low-level file operations needed by the asset pipeline.
pub trait Filesystem {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a regular file that can be opened for reading.
    fn is_readable(&self, path: &Path) -> bool;

    /// Read the whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file's contents, creating parent directories as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Set unix permission bits. A no-op where unsupported.
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Modification time, or `None` if unavailable.
    fn mtime(&self, path: &Path) -> Option<SystemTime>;

    /// Files directly inside `dir` whose name matches `pattern` (`*` wildcards).
    ///
    /// A missing directory yields an empty list.
    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;

    /// Delete a file.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_readable(&self, path: &Path) -> bool {
        path.is_file() && fs::File::open(path).is_ok()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        path.metadata().and_then(|m| m.modified()).ok()
    }

    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if wildcard_match(pattern, &entry.file_name().to_string_lossy()) {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Match `name` against a pattern where `*` matches any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }
    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !name.starts_with(first)
        || !name.ends_with(last)
        || name.len() < first.len() + last.len()
    {
        return false;
    }
    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

/// Check if an output is at least as new as its newest source.
///
/// Returns `false` when the output's mtime cannot be read.
pub fn is_output_fresh(fs: &dyn Filesystem, output: &Path, newest_source: SystemTime) -> bool {
    fs.exists(output)
        && fs.is_readable(output)
        && fs
            .mtime(output)
            .is_some_and(|output_time| output_time >= newest_source)
}
