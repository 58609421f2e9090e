//! Shared types used across the registry, cache and rendering layers.
//!
//! [`AssetKind`] is the single capability switch between scripts and
//! stylesheets: file extension, configured directory, minifier entry point
//! and tag template all hang off it, so there is one `Asset` type instead of
//! a script/style pair of near-identical implementations.

use crate::config::AssetsConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default media attribute for stylesheets declared without one.
pub const DEFAULT_MEDIA: &str = "all";

/// Media types with a fixed emission precedence. Anything else is emitted
/// after these, in the order it was first encountered.
pub const MEDIA_PRECEDENCE: [&str; 3] = ["all", "screen", "print"];

/// The two kinds of asset the manager knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Style,
}

impl AssetKind {
    /// File extension used for sources and cache artifacts (no leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Script => "js",
            AssetKind::Style => "css",
        }
    }

    /// Directory (relative to `base_path` / `base_url`) holding this kind's sources.
    pub fn dir(self, config: &AssetsConfig) -> &str {
        match self {
            AssetKind::Script => &config.script_dir,
            AssetKind::Style => &config.style_dir,
        }
    }

    /// Global minify switch for this kind.
    pub fn minify_enabled(self, config: &AssetsConfig) -> bool {
        match self {
            AssetKind::Script => config.minify_scripts,
            AssetKind::Style => config.minify_styles,
        }
    }

    /// Plural label used in log lines and CLI output.
    pub fn plural(self) -> &'static str {
        match self {
            AssetKind::Script => "scripts",
            AssetKind::Style => "styles",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Script => f.write_str("script"),
            AssetKind::Style => f.write_str("style"),
        }
    }
}
