//! Asset configuration module.
//!
//! Handles loading, validating, and layering `assets.toml` files. A base file
//! declares the directories, output policy and the asset inventory; an
//! optional overlay (e.g. `assets.dev.toml`) overrides it key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "/"            # Public URL the asset directories live under
//! base_path = "public"      # Filesystem directory matching base_url
//! script_dir = "js"         # Script sources, relative to base_path/base_url
//! style_dir = "css"         # Stylesheet sources, relative to base_path/base_url
//! cache_dir = "cache"       # Generated artifacts and bundles
//! cache_prefix = ""         # Prepended to artifact names and bundle hashes
//! dev = false               # Dev mode: never combine, never minify
//! combine = true            # Combine loaded assets into bundles
//! minify_scripts = true
//! minify_styles = true
//! # default_group = "site"  # Loaded on startup and after every reset
//!
//! [groups.site]
//! groups = ["base"]                                  # Included groups
//! scripts = ["app.js", { file = "menu.js", requires = ["app"] }]
//! styles = ["site.css", { file = "print.css", media = "print" }]
//!
//! [[scripts]]
//! file = "https://cdn.example.com/jquery.js"
//! group = "base"
//! cache = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::AssetKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Asset manager configuration loaded from `assets.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Public URL under which `base_path` is served.
    pub base_url: String,
    /// Filesystem directory corresponding to `base_url`.
    pub base_path: PathBuf,
    /// Script directory relative to `base_path` and `base_url`.
    pub script_dir: String,
    /// Stylesheet directory relative to `base_path` and `base_url`.
    pub style_dir: String,
    /// Cache directory relative to `base_path` and `base_url`.
    pub cache_dir: String,
    /// Prefix for per-asset artifact names and bundle hash input.
    pub cache_prefix: String,
    /// Development mode: assets are emitted individually and never minified.
    pub dev: bool,
    /// Combine loaded assets into bundles (ignored in dev mode).
    pub combine: bool,
    /// Global script minification switch.
    pub minify_scripts: bool,
    /// Global stylesheet minification switch.
    pub minify_styles: bool,
    /// Group loaded at startup and after every reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
    /// Named groups, in declaration order.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<String, GroupDecl>,
    /// Scripts declared outside any group table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<AssetEntry>,
    /// Stylesheets declared outside any group table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<AssetEntry>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            base_path: PathBuf::from("public"),
            script_dir: "js".to_string(),
            style_dir: "css".to_string(),
            cache_dir: "cache".to_string(),
            cache_prefix: String::new(),
            dev: false,
            combine: true,
            minify_scripts: true,
            minify_styles: true,
            default_group: None,
            groups: IndexMap::new(),
            scripts: Vec::new(),
            styles: Vec::new(),
        }
    }
}

impl AssetsConfig {
    /// Validate directory settings and the declared inventory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("script_dir", &self.script_dir),
            ("style_dir", &self.style_dir),
            ("cache_dir", &self.cache_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if let Some(default) = &self.default_group
            && !self.groups.contains_key(default)
        {
            return Err(ConfigError::Validation(format!(
                "default_group '{default}' is not a configured group"
            )));
        }
        let group_styles = self.groups.values().flat_map(|g| g.styles.iter());
        for entry in group_styles.chain(self.styles.iter()) {
            if let AssetEntry::Decl(decl) = entry
                && decl.media.as_deref().is_some_and(|m| m.trim().is_empty())
            {
                return Err(ConfigError::Validation(format!(
                    "style '{}' has an empty media value",
                    decl.file
                )));
            }
        }
        Ok(())
    }

    /// Combined output is active only outside dev mode.
    pub fn combined(&self) -> bool {
        self.combine && !self.dev
    }

    /// Filesystem directory holding cache artifacts.
    pub fn cache_path(&self) -> PathBuf {
        self.base_path.join(&self.cache_dir)
    }

    /// Filesystem directory holding sources of the given kind.
    pub fn source_path(&self, kind: AssetKind) -> PathBuf {
        self.base_path.join(kind.dir(self))
    }
}

/// One asset declaration: either a bare file reference or a full table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AssetEntry {
    File(String),
    Decl(AssetDecl),
}

impl AssetEntry {
    /// Normalize into a full declaration with defaults applied.
    pub fn into_decl(self) -> AssetDecl {
        match self {
            AssetEntry::File(file) => AssetDecl::new(file),
            AssetEntry::Decl(decl) => decl,
        }
    }
}

impl From<&str> for AssetEntry {
    fn from(file: &str) -> Self {
        AssetEntry::File(file.to_string())
    }
}

impl From<AssetDecl> for AssetEntry {
    fn from(decl: AssetDecl) -> Self {
        AssetEntry::Decl(decl)
    }
}

/// Typed asset declaration.
///
/// Defaults: `minify = true`, `cache = true`, no groups, no requirements,
/// name derived from `file`, media `"all"` (stylesheets only; ignored for
/// scripts).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AssetDecl {
    /// File reference: relative to the kind's directory, or a remote URL.
    pub file: String,
    /// Explicit name; derived from the file basename when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stylesheet media attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Eligible for minification (still subject to the global switch and dev mode).
    #[serde(default = "default_true")]
    pub minify: bool,
    /// Served from a generated cache artifact.
    #[serde(default = "default_true")]
    pub cache: bool,
    /// Single group shorthand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Group memberships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Names of same-kind assets that must be emitted before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl AssetDecl {
    /// A declaration with every option at its default.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            name: None,
            media: None,
            minify: true,
            cache: true,
            group: None,
            groups: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    pub fn no_minify(mut self) -> Self {
        self.minify = false;
        self
    }

    /// `group` and `groups` merged, deduplicated, in declaration order.
    pub fn all_groups(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for g in self.group.iter().chain(self.groups.iter()) {
            if !g.is_empty() && !out.contains(g) {
                out.push(g.clone());
            }
        }
        out
    }
}

/// Group declaration: member assets and included groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GroupDecl {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<AssetEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<AssetEntry>,
    /// Groups whose members are pulled in when this group loads.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn read_raw(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AssetsConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AssetsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a single config file.
///
/// A relative `base_path` is resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<AssetsConfig, ConfigError> {
    load_config_layered(path, None)
}

/// Load a base config file with an optional overlay file on top.
///
/// A missing overlay file is not an error; a missing base file is.
pub fn load_config_layered(
    path: &Path,
    overlay: Option<&Path>,
) -> Result<AssetsConfig, ConfigError> {
    let base = read_raw(path)?;
    let overlay = match overlay {
        Some(p) if p.exists() => Some(read_raw(p)?),
        _ => None,
    };
    let mut config = resolve_config(base, overlay)?;
    if config.base_path.is_relative()
        && let Some(dir) = path.parent()
    {
        config.base_path = dir.join(&config.base_path);
    }
    Ok(config)
}

/// Returns a fully-commented stock `assets.toml`.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-assets configuration
# All options are optional. Values shown are the defaults.

# Public URL under which base_path is served.
base_url = "/"

# Filesystem directory matching base_url (relative to this file).
base_path = "public"

# Source directories, relative to base_path and base_url.
script_dir = "js"
style_dir = "css"

# Generated artifacts (parsed, minified, combined) live here.
# The directory is owned by simple-assets: clear-cache removes every
# .js and .css file in it.
cache_dir = "cache"

# Prepended to per-asset artifact names and to the bundle hash input.
cache_prefix = ""

# Dev mode emits every asset individually and never minifies.
dev = false

# Combine loaded assets into one bundle per kind (per media for styles).
combine = true

minify_scripts = true
minify_styles = true

# Group loaded on startup and after every reset.
# default_group = "site"

# ---------------------------------------------------------------------------
# Groups
# ---------------------------------------------------------------------------
# Entries are either a file reference or a table:
#   { file = "x.js", name = "x", minify = true, cache = true,
#     requires = ["y"], media = "print" (styles only) }
#
# [groups.site]
# groups = ["base"]
# scripts = ["app.js", { file = "menu.js", requires = ["app"] }]
# styles = ["site.css", { file = "print.css", media = "print" }]

# ---------------------------------------------------------------------------
# Loose assets
# ---------------------------------------------------------------------------
# [[scripts]]
# file = "https://cdn.example.com/jquery.js"
# group = "base"
# cache = false
"##
}
