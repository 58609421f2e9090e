//! Cache artifacts for parsed, minified and combined assets.
//!
//! Minifying and concatenating on every request would be wasteful, so each
//! processed form of an asset is written once to the cache directory and
//! served from there until its source changes.
//!
//! # Design
//!
//! The cache directory is flat and has no manifest: the file names are
//! deterministic and the files' modification times *are* the index.
//!
//! ```text
//! <cache_dir>/
//! ├── <prefix>app.parsed.js        # markers substituted
//! ├── <prefix>app.parsed.min.js    # markers substituted, then minified
//! ├── <prefix>site.parsed.css
//! └── 3f2a…9c.js                   # bundle: md5(prefix + names)
//! ```
//!
//! ## Freshness
//!
//! An artifact is fresh iff it exists, is readable and its mtime is at least
//! the newest `source_modified_at` among its constituents. Anything else is
//! a full regeneration; there is no incremental update. Remote sources have
//! an epoch modification time, so once fetched their artifacts stay fresh
//! until the cache is cleared.
//!
//! ## Bundle identity
//!
//! A bundle is named by the MD5 of the cache prefix followed by the
//! constituent names concatenated in emission order. The same ordered list
//! always maps to the same file; changing the prefix moves every bundle.

use crate::asset::AssetError;
use crate::fs::{ARTIFACT_MODE, Filesystem};
use crate::types::AssetKind;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use std::cell::Cell;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

/// Version stamp used when a file's modification time is unknown.
pub const EPOCH_STAMP: &str = "19700101";

/// File name of a per-asset artifact.
pub fn artifact_name(prefix: &str, name: &str, kind: AssetKind, minified: bool) -> String {
    let variant = if minified { "parsed.min" } else { "parsed" };
    format!("{}{}.{}.{}", prefix, name, variant, kind.extension())
}

/// MD5 hex digest of the prefix followed by the concatenated names.
pub fn bundle_hash<S: AsRef<str>>(prefix: &str, names: &[S]) -> String {
    let mut hasher = Md5::new();
    hasher.update(prefix.as_bytes());
    for name in names {
        hasher.update(name.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// File name of a bundle for the given ordered constituent names.
pub fn bundle_name<S: AsRef<str>>(prefix: &str, names: &[S], kind: AssetKind) -> String {
    format!("{}.{}", bundle_hash(prefix, names), kind.extension())
}

/// `YYYYMMDD` (UTC) of a modification time, or [`EPOCH_STAMP`] when unknown.
pub fn version_stamp(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => DateTime::<Utc>::from(time).format("%Y%m%d").to_string(),
        None => EPOCH_STAMP.to_string(),
    }
}

/// Write an artifact and make it world-readable.
pub fn write_artifact(fs: &dyn Filesystem, path: &Path, contents: &str) -> Result<(), AssetError> {
    let to_error = |source: io::Error| AssetError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };
    fs.write(path, contents.as_bytes()).map_err(to_error)?;
    fs.set_permissions(path, ARTIFACT_MODE).map_err(to_error)?;
    info!(path = %path.display(), bytes = contents.len(), "wrote cache artifact");
    Ok(())
}

/// Read an artifact as text (lossy on invalid UTF-8).
pub fn read_artifact(fs: &dyn Filesystem, path: &Path) -> Result<String, AssetError> {
    fs.read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|_| AssetError::SourceUnreadable(path.to_path_buf()))
}

/// Remove every script and stylesheet artifact from the cache directory.
///
/// Returns the removed paths.
pub fn clear_cache(fs: &dyn Filesystem, cache_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for kind in [AssetKind::Script, AssetKind::Style] {
        let pattern = format!("*.{}", kind.extension());
        for path in fs.glob(cache_dir, &pattern)? {
            fs.remove(&path)?;
            removed.push(path);
        }
    }
    info!(dir = %cache_dir.display(), removed = removed.len(), "cleared asset cache");
    Ok(removed)
}

/// Summary of cache behaviour for a render pass.
///
/// Counters use `Cell` so assets can record outcomes through a shared
/// [`Context`](crate::context::Context).
#[derive(Debug, Default)]
pub struct CacheStats {
    fresh: Cell<u32>,
    rebuilt: Cell<u32>,
    failed: Cell<u32>,
}

impl CacheStats {
    pub fn fresh(&self) {
        self.fresh.set(self.fresh.get() + 1);
    }

    pub fn rebuilt(&self) {
        self.rebuilt.set(self.rebuilt.get() + 1);
    }

    pub fn failed(&self) {
        self.failed.set(self.failed.get() + 1);
    }

    pub fn fresh_count(&self) -> u32 {
        self.fresh.get()
    }

    pub fn rebuilt_count(&self) -> u32 {
        self.rebuilt.get()
    }

    pub fn failed_count(&self) -> u32 {
        self.failed.get()
    }

    pub fn total(&self) -> u32 {
        self.fresh_count() + self.rebuilt_count() + self.failed_count()
    }

    pub fn reset(&self) {
        self.fresh.set(0);
        self.rebuilt.set(0);
        self.failed.set(0);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fresh, rebuilt, failed) = (self.fresh_count(), self.rebuilt_count(), self.failed_count());
        if failed > 0 {
            write!(
                f,
                "{} fresh, {} rebuilt, {} failed ({} total)",
                fresh,
                rebuilt,
                failed,
                self.total()
            )
        } else if fresh > 0 {
            write!(f, "{} fresh, {} rebuilt ({} total)", fresh, rebuilt, self.total())
        } else {
            write!(f, "{} rebuilt", rebuilt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    // =========================================================================
    // Naming
    // =========================================================================

    #[test]
    fn artifact_names() {
        assert_eq!(
            artifact_name("", "app", AssetKind::Script, false),
            "app.parsed.js"
        );
        assert_eq!(
            artifact_name("v2-", "site", AssetKind::Style, true),
            "v2-site.parsed.min.css"
        );
    }

    #[test]
    fn bundle_hash_is_md5_of_prefix_and_names() {
        // md5("") and md5("abc") are well known
        assert_eq!(
            bundle_hash::<&str>("", &[]),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            bundle_hash("a", &["b", "c"]),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn bundle_name_deterministic() {
        let names = ["jquery", "app", "menu"];
        assert_eq!(
            bundle_name("", &names, AssetKind::Script),
            bundle_name("", &names, AssetKind::Script)
        );
        assert!(bundle_name("", &names, AssetKind::Script).ends_with(".js"));
    }

    #[test]
    fn bundle_name_varies_with_prefix() {
        let names = ["jquery", "app"];
        assert_ne!(
            bundle_name("", &names, AssetKind::Script),
            bundle_name("v2-", &names, AssetKind::Script)
        );
    }

    #[test]
    fn bundle_name_varies_with_order() {
        assert_ne!(
            bundle_name("", &["a", "b"], AssetKind::Style),
            bundle_name("", &["b", "a"], AssetKind::Style)
        );
    }

    // =========================================================================
    // Version stamps
    // =========================================================================

    #[test]
    fn version_stamp_formats_utc_date() {
        // 2024-03-05T12:00:00Z
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_709_640_000);
        assert_eq!(version_stamp(Some(time)), "20240305");
    }

    #[test]
    fn version_stamp_epoch_and_unknown() {
        assert_eq!(version_stamp(Some(SystemTime::UNIX_EPOCH)), EPOCH_STAMP);
        assert_eq!(version_stamp(None), EPOCH_STAMP);
    }

    // =========================================================================
    // Disk operations
    // =========================================================================

    #[test]
    fn write_then_read_artifact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache/app.parsed.js");
        write_artifact(&LocalFs, &path, "var a=1;").unwrap();
        assert_eq!(read_artifact(&LocalFs, &path).unwrap(), "var a=1;");
    }

    #[test]
    fn write_artifact_failure_is_cache_write_error() {
        let tmp = TempDir::new().unwrap();
        // a regular file where the cache directory should be
        let blocker = tmp.path().join("cache");
        fs::write(&blocker, "not a dir").unwrap();
        let err = write_artifact(&LocalFs, &blocker.join("a.js"), "x").unwrap_err();
        assert!(matches!(err, AssetError::CacheWrite { .. }));
    }

    #[test]
    fn clear_cache_removes_only_assets() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.parsed.js", "b.parsed.min.css", "0123.js", "keep.txt"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        let removed = clear_cache(&LocalFs, tmp.path()).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(tmp.path().join("keep.txt").exists());
        assert!(!tmp.path().join("0123.js").exists());
    }

    #[test]
    fn clear_missing_cache_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(clear_cache(&LocalFs, &tmp.path().join("cache")).unwrap().is_empty());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_fresh() {
        let s = CacheStats::default();
        for _ in 0..5 {
            s.fresh();
        }
        s.rebuilt();
        s.rebuilt();
        assert_eq!(format!("{}", s), "5 fresh, 2 rebuilt (7 total)");
    }

    #[test]
    fn cache_stats_display_with_failures() {
        let s = CacheStats::default();
        s.fresh();
        s.rebuilt();
        s.failed();
        assert_eq!(format!("{}", s), "1 fresh, 1 rebuilt, 1 failed (3 total)");
    }

    #[test]
    fn cache_stats_display_cold() {
        let s = CacheStats::default();
        s.rebuilt();
        s.rebuilt();
        s.rebuilt();
        assert_eq!(format!("{}", s), "3 rebuilt");
    }

    #[test]
    fn cache_stats_reset() {
        let s = CacheStats::default();
        s.failed();
        s.reset();
        assert_eq!(s.total(), 0);
    }
}
