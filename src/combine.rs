//! Combined bundles: many assets served as one cached file.
//!
//! A bundle covers an ordered list of same-kind assets (for stylesheets, one
//! media partition). Its file is named by [`cache::bundle_name`] and rebuilt
//! whenever it is missing or older than its newest constituent.
//!
//! ## Rebuild
//!
//! Each constituent contributes its processed [`Asset::contents`], joined
//! with a newline in emission order. A constituent whose contents cannot be
//! produced is reported and left out. A bundle with nothing left in it is an
//! [`AssetError::EmptyBundle`], which sends the caller to per-asset tags.

use crate::asset::{Asset, AssetError};
use crate::cache::{self, version_stamp};
use crate::config::AssetsConfig;
use crate::context::Context;
use crate::fs::is_output_fresh;
use crate::naming::join_url;
use crate::render;
use crate::types::AssetKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

fn file_name(config: &AssetsConfig, kind: AssetKind, assets: &[&Asset]) -> String {
    let names: Vec<&str> = assets.iter().map(|a| a.name()).collect();
    cache::bundle_name(&config.cache_prefix, &names, kind)
}

pub fn bundle_path(config: &AssetsConfig, kind: AssetKind, assets: &[&Asset]) -> PathBuf {
    config.cache_path().join(file_name(config, kind, assets))
}

pub fn bundle_url(config: &AssetsConfig, kind: AssetKind, assets: &[&Asset]) -> String {
    join_url(
        &config.base_url,
        &[config.cache_dir.as_str(), &file_name(config, kind, assets)],
    )
}

/// Make sure the bundle for `assets` exists and is fresh, rebuilding it if not.
pub fn ensure_bundle(
    cx: &Context<'_>,
    kind: AssetKind,
    assets: &[&Asset],
) -> Result<PathBuf, AssetError> {
    let path = bundle_path(cx.config, kind, assets);
    let newest = assets
        .iter()
        .map(|a| a.source_modified_at(cx.fs()))
        .max()
        .unwrap_or(SystemTime::UNIX_EPOCH);

    if is_output_fresh(cx.fs(), &path, newest) {
        debug!(bundle = %path.display(), assets = assets.len(), "bundle fresh");
        cx.stats.fresh();
        return Ok(path);
    }

    match build(cx, assets, &path) {
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

fn build(cx: &Context<'_>, assets: &[&Asset], path: &Path) -> Result<(), AssetError> {
    let mut parts = Vec::with_capacity(assets.len());
    for asset in assets {
        match asset.contents(cx) {
            Ok(contents) => parts.push(contents),
            Err(e) => cx.report(&e),
        }
    }
    if parts.is_empty() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(AssetError::EmptyBundle(name));
    }
    cache::write_artifact(cx.fs(), path, &parts.join("\n"))
}

/// Tag for the bundle of `assets`, building it first when needed.
///
/// `media` is used for stylesheets only.
pub fn bundle_tag(
    cx: &Context<'_>,
    kind: AssetKind,
    assets: &[&Asset],
    media: &str,
) -> Result<String, AssetError> {
    let path = ensure_bundle(cx, kind, assets)?;
    let url = render::versioned(
        &bundle_url(cx.config, kind, assets),
        &version_stamp(cx.fs().mtime(&path)),
    );
    Ok(match kind {
        AssetKind::Script => render::script_tag(&url),
        AssetKind::Style => render::style_tag(&url, media),
    })
}
