//! A single declared script or stylesheet.
//!
//! An [`Asset`] knows where its source lives (local file or remote URL),
//! which groups it belongs to, which same-kind assets it requires, and how
//! to produce its cache artifact and its HTML tag. All I/O goes through the
//! [`Context`] it is handed, never through ambient state.
//!
//! ## Failure semantics
//!
//! Every file or network problem is a recoverable [`AssetError`]. At
//! declaration time the asset is dropped; at render time the asset degrades
//! to its raw source URL or is skipped from a bundle. The error is sent
//! through [`Context::report`] and the pass carries on.

use crate::cache::{self, version_stamp};
use crate::config::{AssetDecl, AssetsConfig};
use crate::context::Context;
use crate::fetch::{CONNECT_TIMEOUT, FetchError};
use crate::fs::{Filesystem, is_output_fresh};
use crate::markers;
use crate::naming::{derive_asset_name, is_remote, join_url};
use crate::render;
use crate::types::{AssetKind, DEFAULT_MEDIA};
use indexmap::IndexSet;
use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Invalid {kind} declaration: {detail}")]
    InvalidDeclaration { kind: AssetKind, detail: String },
    #[error("Source unreadable: {}", .0.display())]
    SourceUnreadable(PathBuf),
    #[error("Cache write failed for {}: {source}", path.display())]
    CacheWrite { path: PathBuf, source: io::Error },
    #[error("Remote fetch failed: {0}")]
    RemoteFetch(#[from] FetchError),
    #[error("{kind} '{name}' is required but not available")]
    MissingRequirement { kind: AssetKind, name: String },
    #[error("Bundle {0} has no content")]
    EmptyBundle(String),
}

/// Where an asset's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Local { path: PathBuf, url: String },
    Remote { url: String },
}

impl AssetSource {
    pub fn url(&self) -> &str {
        match self {
            AssetSource::Local { url, .. } | AssetSource::Remote { url } => url,
        }
    }
}

#[derive(Debug)]
pub struct Asset {
    name: String,
    kind: AssetKind,
    file: String,
    source: AssetSource,
    groups: IndexSet<String>,
    requires: Vec<String>,
    cacheable: bool,
    minify: bool,
    media: String,
    /// Source mtime, computed on first use.
    modified_at: Cell<Option<SystemTime>>,
}

impl Asset {
    /// Build an asset from a declaration, resolving and checking its source.
    pub fn new(
        kind: AssetKind,
        decl: AssetDecl,
        config: &AssetsConfig,
        fs: &dyn Filesystem,
    ) -> Result<Self, AssetError> {
        let file = decl.file.trim();
        if file.is_empty() {
            return Err(AssetError::InvalidDeclaration {
                kind,
                detail: "empty file reference".to_string(),
            });
        }
        let name = match decl.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => derive_asset_name(file, kind),
        };
        let source = Self::resolve(kind, file, config, fs)?;
        let groups = decl.all_groups().into_iter().collect();
        let media = decl
            .media
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MEDIA)
            .to_string();

        Ok(Self {
            name,
            kind,
            file: file.to_string(),
            source,
            groups,
            requires: decl.requires.into_iter().filter(|r| !r.is_empty()).collect(),
            cacheable: decl.cache,
            minify: decl.minify,
            media,
            modified_at: Cell::new(None),
        })
    }

    /// Resolve a file reference to a local path + URL, or a remote URL.
    ///
    /// Local files must exist and be readable.
    pub fn resolve(
        kind: AssetKind,
        file_ref: &str,
        config: &AssetsConfig,
        fs: &dyn Filesystem,
    ) -> Result<AssetSource, AssetError> {
        if is_remote(file_ref) {
            return Ok(AssetSource::Remote {
                url: file_ref.to_string(),
            });
        }
        let relative = file_ref.trim_start_matches('/');
        let path = config.source_path(kind).join(relative);
        if !fs.exists(&path) || !fs.is_readable(&path) {
            return Err(AssetError::SourceUnreadable(path));
        }
        let url = join_url(&config.base_url, &[kind.dir(config), relative]);
        Ok(AssetSource::Local { path, url })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The file reference as declared.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, AssetSource::Remote { .. })
    }

    pub fn groups(&self) -> &IndexSet<String> {
        &self.groups
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn is_minify_eligible(&self) -> bool {
        self.minify
    }

    /// Media attribute (meaningful for stylesheets only).
    pub fn media(&self) -> &str {
        &self.media
    }

    /// Add group memberships. Returns the groups that were new.
    pub fn add_to_groups<I, S>(&mut self, groups: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for group in groups {
            let group = group.into();
            if !group.is_empty() && self.groups.insert(group.clone()) {
                added.push(group);
            }
        }
        added
    }

    /// Eligible, globally enabled for this kind, and not in dev mode.
    pub fn effective_minify(&self, config: &AssetsConfig) -> bool {
        self.minify && self.kind.minify_enabled(config) && !config.dev
    }

    /// Source modification time; epoch for remote or unavailable sources.
    pub fn source_modified_at(&self, fs: &dyn Filesystem) -> SystemTime {
        if let Some(time) = self.modified_at.get() {
            return time;
        }
        let time = match &self.source {
            AssetSource::Local { path, .. } => fs.mtime(path).unwrap_or(SystemTime::UNIX_EPOCH),
            AssetSource::Remote { .. } => SystemTime::UNIX_EPOCH,
        };
        self.modified_at.set(Some(time));
        time
    }

    /// Drop the memoized source mtime so the next pass re-reads it.
    pub fn forget_modified_at(&self) {
        self.modified_at.set(None);
    }

    /// Path of the artifact this asset is served from under the current config.
    pub fn artifact_path(&self, config: &AssetsConfig) -> PathBuf {
        config.cache_path().join(self.artifact_file(config))
    }

    /// URL of the artifact this asset is served from under the current config.
    pub fn artifact_url(&self, config: &AssetsConfig) -> String {
        join_url(
            &config.base_url,
            &[config.cache_dir.as_str(), &self.artifact_file(config)],
        )
    }

    fn artifact_file(&self, config: &AssetsConfig) -> String {
        cache::artifact_name(
            &config.cache_prefix,
            &self.name,
            self.kind,
            self.effective_minify(config),
        )
    }

    /// Make sure the artifact exists and is not older than the source.
    ///
    /// Regenerates it (fetch, substitute markers, optionally minify, write)
    /// when stale or missing.
    pub fn ensure_artifact(&self, cx: &Context<'_>) -> Result<PathBuf, AssetError> {
        let path = self.artifact_path(cx.config);
        let newest = self.source_modified_at(cx.fs());
        if is_output_fresh(cx.fs(), &path, newest) {
            debug!(asset = %self.name, path = %path.display(), "artifact fresh");
            cx.stats.fresh();
            return Ok(path);
        }

        let minified = self.effective_minify(cx.config);
        let result = self.raw_contents(cx).and_then(|raw| {
            let processed = self.process(cx, &raw, minified);
            cache::write_artifact(cx.fs(), &path, &processed)
        });
        match result {
            Ok(()) => {
                cx.stats.rebuilt();
                Ok(path)
            }
            Err(e) => {
                cx.stats.failed();
                Err(e)
            }
        }
    }

    /// Unprocessed source text: local read or remote fetch.
    pub fn raw_contents(&self, cx: &Context<'_>) -> Result<String, AssetError> {
        match &self.source {
            AssetSource::Local { path, .. } => cx
                .fs()
                .read(path)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|_| AssetError::SourceUnreadable(path.clone())),
            AssetSource::Remote { url } => Ok(cx.fetcher().fetch(url, CONNECT_TIMEOUT)?),
        }
    }

    fn process(&self, cx: &Context<'_>, raw: &str, minified: bool) -> String {
        let parsed = markers::substitute(raw, cx.config);
        if !minified {
            return parsed;
        }
        match cx.minifier().minify(self.kind, &parsed) {
            Some(min) => min,
            None => {
                warn!(asset = %self.name, "minifier rejected input, keeping it unminified");
                parsed
            }
        }
    }

    /// Processed contents, as they go into a bundle.
    ///
    /// Cacheable assets are read back from their artifact. When the artifact
    /// cannot be written the contents are processed in memory instead.
    pub fn contents(&self, cx: &Context<'_>) -> Result<String, AssetError> {
        if !self.cacheable {
            let raw = self.raw_contents(cx)?;
            return Ok(markers::substitute(&raw, cx.config));
        }
        match self.ensure_artifact(cx) {
            Ok(path) => match cache::read_artifact(cx.fs(), &path) {
                Ok(contents) => return Ok(contents),
                Err(e) => cx.report(&e),
            },
            Err(e @ AssetError::CacheWrite { .. }) => cx.report(&e),
            Err(e) => return Err(e),
        }
        let raw = self.raw_contents(cx)?;
        Ok(self.process(cx, &raw, self.effective_minify(cx.config)))
    }

    /// URL to reference in the tag, plus the mtime its version stamp uses.
    fn output_target(&self, cx: &Context<'_>) -> (String, Option<SystemTime>) {
        if self.cacheable {
            match self.ensure_artifact(cx) {
                Ok(path) => return (self.artifact_url(cx.config), cx.fs().mtime(&path)),
                Err(e) => cx.report(&e),
            }
        }
        match &self.source {
            AssetSource::Local { path, url } => (url.clone(), cx.fs().mtime(path)),
            AssetSource::Remote { url } => (url.clone(), None),
        }
    }

    /// The URL the tag points at: the artifact when available, else the source.
    pub fn output_src(&self, cx: &Context<'_>) -> String {
        self.output_target(cx).0
    }

    /// `YYYYMMDD` of the served file; `19700101` for remote sources.
    pub fn version_suffix(&self, cx: &Context<'_>) -> String {
        version_stamp(self.output_target(cx).1)
    }

    /// The complete `<script>` or `<link>` tag.
    pub fn render_tag(&self, cx: &Context<'_>) -> String {
        let (src, modified) = self.output_target(cx);
        let url = render::versioned(&src, &version_stamp(modified));
        match self.kind {
            AssetKind::Script => render::script_tag(&url),
            AssetKind::Style => render::style_tag(&url, &self.media),
        }
    }
}
