//! Shared test utilities for the simple-assets test suite.
//!
//! Provides an in-memory [`Filesystem`] with a controllable clock, a canned
//! [`RemoteFetcher`], a predictable [`Minifier`], and a [`Harness`] that
//! wires them into a [`Context`] or a full [`AssetManager`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let h = Harness::new();
//! h.add_script("app.js", "var app = 1;");
//! let asset = h.script(AssetDecl::new("app.js")).unwrap();
//! asset.ensure_artifact(&h.cx()).unwrap();
//! assert_eq!(h.fs.contents("/site/cache/app.parsed.min.js").unwrap(), "varapp=1;");
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use crate::asset::{Asset, AssetError};
use crate::cache::CacheStats;
use crate::config::{AssetDecl, AssetsConfig};
use crate::context::{Context, Services};
use crate::fetch::{FetchError, RemoteFetcher};
use crate::fs::{Filesystem, wildcard_match};
use crate::manager::AssetManager;
use crate::minify::Minifier;
use crate::types::AssetKind;

/// 2024-01-01T00:00:00Z
pub const START_SECS: u64 = 1_704_067_200;

// =========================================================================
// In-memory filesystem
// =========================================================================

#[derive(Debug, Clone)]
struct MemFile {
    bytes: Vec<u8>,
    mtime: SystemTime,
    mode: u32,
}

#[derive(Debug)]
struct MemState {
    files: BTreeMap<PathBuf, MemFile>,
    now: SystemTime,
    writes: Vec<PathBuf>,
    fail_writes: bool,
}

/// Filesystem backed by a map. Clones share state, so a test can keep a
/// handle while the manager owns another.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    state: Rc<RefCell<MemState>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MemState {
                files: BTreeMap::new(),
                now: SystemTime::UNIX_EPOCH + Duration::from_secs(START_SECS),
                writes: Vec::new(),
                fail_writes: false,
            })),
        }
    }

    /// Create or replace a file, stamped with the current clock.
    pub fn put(&self, path: impl AsRef<Path>, contents: &str) {
        let mut state = self.state.borrow_mut();
        let file = MemFile {
            bytes: contents.as_bytes().to_vec(),
            mtime: state.now,
            mode: 0o600,
        };
        state.files.insert(path.as_ref().to_path_buf(), file);
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.state.borrow_mut().now += Duration::from_secs(secs);
    }

    pub fn delete(&self, path: impl AsRef<Path>) {
        self.state.borrow_mut().files.remove(path.as_ref());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .borrow()
            .files
            .get(path.as_ref())
            .map(|f| String::from_utf8_lossy(&f.bytes).into_owned())
    }

    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        self.state.borrow().files.get(path.as_ref()).map(|f| f.mode)
    }

    pub fn file_mtime(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
        self.state.borrow().files.get(path.as_ref()).map(|f| f.mtime)
    }

    /// Every path written through [`Filesystem::write`], in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.state.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Make every subsequent write fail with a permission error.
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// All paths under `dir`, sorted.
    pub fn paths_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        self.state
            .borrow()
            .files
            .keys()
            .filter(|p| p.starts_with(dir.as_ref()))
            .cloned()
            .collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

impl Filesystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.state.borrow().files.contains_key(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.state
            .borrow()
            .files
            .get(path)
            .map(|f| f.bytes.clone())
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            ));
        }
        let file = MemFile {
            bytes: bytes.to_vec(),
            mtime: state.now,
            mode: 0o600,
        };
        state.files.insert(path.to_path_buf(), file);
        state.writes.push(path.to_path_buf());
        Ok(())
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let file = state.files.get_mut(path).ok_or_else(|| not_found(path))?;
        file.mode = mode;
        Ok(())
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        self.file_mtime(path)
    }

    fn glob(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .state
            .borrow()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| wildcard_match(pattern, &n.to_string_lossy()))
            })
            .cloned()
            .collect())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.state
            .borrow_mut()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

// =========================================================================
// Canned fetcher and predictable minifier
// =========================================================================

/// Fetcher answering from a URL → body map; unknown URLs are a 404.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    responses: Rc<RefCell<BTreeMap<String, String>>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl MockFetcher {
    pub fn respond(&self, url: &str, body: &str) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), body.to_string());
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl RemoteFetcher for MockFetcher {
    fn fetch(&self, url: &str, _connect_timeout: Duration) -> Result<String, FetchError> {
        self.calls.borrow_mut().push(url.to_string());
        self.responses
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Strips all whitespace. Input containing `SYNTAX ERROR` is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestMinifier;

impl TestMinifier {
    fn strip(source: &str) -> Option<String> {
        if source.contains("SYNTAX ERROR") {
            return None;
        }
        Some(source.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

impl Minifier for TestMinifier {
    fn minify_css(&self, source: &str) -> Option<String> {
        Self::strip(source)
    }

    fn minify_js(&self, source: &str) -> Option<String> {
        Self::strip(source)
    }
}

// =========================================================================
// Harness
// =========================================================================

/// Config rooted at `/site`, served from `/`, with the test doubles wired in.
pub struct Harness {
    pub config: AssetsConfig,
    pub services: Services,
    pub stats: CacheStats,
    pub fs: MemoryFs,
    pub fetcher: MockFetcher,
    failures: Rc<RefCell<Vec<String>>>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let config = AssetsConfig {
            base_path: PathBuf::from("/site"),
            ..AssetsConfig::default()
        };
        let fs = MemoryFs::new();
        let fetcher = MockFetcher::default();
        let failures = Rc::new(RefCell::new(Vec::new()));
        let services = Self::services_for(&fs, &fetcher, &failures);
        Self {
            config,
            services,
            stats: CacheStats::default(),
            fs,
            fetcher,
            failures,
        }
    }

    fn services_for(
        fs: &MemoryFs,
        fetcher: &MockFetcher,
        failures: &Rc<RefCell<Vec<String>>>,
    ) -> Services {
        let sink = Rc::clone(failures);
        Services::default()
            .with_fs(fs.clone())
            .with_fetcher(fetcher.clone())
            .with_minifier(TestMinifier)
            .on_failure(move |e: &AssetError| sink.borrow_mut().push(e.to_string()))
    }

    pub fn cx(&self) -> Context<'_> {
        Context::new(&self.config, &self.services, &self.stats)
    }

    /// Write a script source under `/site/js/`.
    pub fn add_script(&self, file: &str, contents: &str) {
        self.fs.put(Path::new("/site/js").join(file), contents);
    }

    /// Write a stylesheet source under `/site/css/`.
    pub fn add_style(&self, file: &str, contents: &str) {
        self.fs.put(Path::new("/site/css").join(file), contents);
    }

    pub fn script(&self, decl: AssetDecl) -> Result<Asset, AssetError> {
        Asset::new(AssetKind::Script, decl, &self.config, &self.fs)
    }

    pub fn style(&self, decl: AssetDecl) -> Result<Asset, AssetError> {
        Asset::new(AssetKind::Style, decl, &self.config, &self.fs)
    }

    /// Messages of every failure reported so far.
    pub fn failures(&self) -> Vec<String> {
        self.failures.borrow().clone()
    }

    /// A manager over the harness config and doubles. Panics on invalid config.
    pub fn manager(&self) -> AssetManager {
        let services = Self::services_for(&self.fs, &self.fetcher, &self.failures);
        AssetManager::with_services(self.config.clone(), services).unwrap()
    }
}
