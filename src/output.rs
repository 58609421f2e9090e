//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (group, script, stylesheet) leads with its positional index
//! and name; where it comes from and how it is treated follow as indented
//! context lines.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Groups
//! 001 site (2 scripts, 1 style)
//!     Includes: base
//!     Scripts: app, menu
//!     Styles: site
//!
//! Scripts
//! 001 app
//!     Source: /js/app.js
//!     Requires: jquery
//!     Groups: site
//! 002 jquery
//!     Source: https://code.jquery.com/jquery.js
//!     Flags: remote, no cache
//!
//! Styles
//! 001 print [print]
//!     Source: /css/print.css
//! ```
//!
//! ## Render
//!
//! The tags go to stdout untouched so they can be piped into a template;
//! the cache summary goes to stderr:
//!
//! ```text
//! Cache: 3 fresh, 1 rebuilt (4 total)
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and are pure; `print_*`
//! wrappers write them out. [`Inventory`] is the serializable form used by
//! `check --json`.

use crate::asset::Asset;
use crate::cache::CacheStats;
use crate::registry::{AssetRegistry, Group};
use crate::types::AssetKind;
use serde::Serialize;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `1 script`, `2 styles`.
fn count_label(n: usize, kind: AssetKind) -> String {
    if n == 1 {
        format!("{} {}", n, kind)
    } else {
        format!("{} {}", n, kind.plural())
    }
}

fn join_names<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn flags(asset: &Asset) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if asset.is_remote() {
        flags.push("remote");
    }
    if !asset.is_cacheable() {
        flags.push("no cache");
    }
    if !asset.is_minify_eligible() {
        flags.push("no minify");
    }
    flags
}

// ============================================================================
// Check output
// ============================================================================

fn group_lines(index: usize, group: &Group) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({}, {})",
        format_index(index),
        group.name,
        count_label(group.scripts.len(), AssetKind::Script),
        count_label(group.styles.len(), AssetKind::Style)
    )];
    if !group.included_groups.is_empty() {
        lines.push(format!("    Includes: {}", join_names(&group.included_groups)));
    }
    if !group.scripts.is_empty() {
        lines.push(format!("    Scripts: {}", join_names(&group.scripts)));
    }
    if !group.styles.is_empty() {
        lines.push(format!("    Styles: {}", join_names(&group.styles)));
    }
    lines
}

fn asset_lines(index: usize, asset: &Asset) -> Vec<String> {
    let header = match asset.kind() {
        AssetKind::Style => format!("{} {} [{}]", format_index(index), asset.name(), asset.media()),
        AssetKind::Script => format!("{} {}", format_index(index), asset.name()),
    };
    let mut lines = vec![header, format!("    Source: {}", asset.source().url())];
    if !asset.requires().is_empty() {
        lines.push(format!("    Requires: {}", join_names(asset.requires())));
    }
    if !asset.groups().is_empty() {
        lines.push(format!("    Groups: {}", join_names(asset.groups())));
    }
    let flags = flags(asset);
    if !flags.is_empty() {
        lines.push(format!("    Flags: {}", flags.join(", ")));
    }
    lines
}

/// Format the declared inventory: groups, then scripts, then styles.
pub fn format_inventory(registry: &AssetRegistry) -> Vec<String> {
    let mut lines = vec!["Groups".to_string()];
    for (i, group) in registry.groups().values().enumerate() {
        lines.extend(group_lines(i + 1, group));
    }
    for kind in [AssetKind::Script, AssetKind::Style] {
        lines.push(String::new());
        lines.push(if kind == AssetKind::Script { "Scripts" } else { "Styles" }.to_string());
        for (i, asset) in registry.assets(kind).values().enumerate() {
            lines.extend(asset_lines(i + 1, asset));
        }
    }
    lines
}

pub fn print_inventory(registry: &AssetRegistry) {
    for line in format_inventory(registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Render output
// ============================================================================

pub fn format_cache_summary(stats: &CacheStats) -> String {
    format!("Cache: {}", stats)
}

/// Print rendered tags to stdout and the cache summary to stderr.
pub fn print_render_output(tags: &str, stats: &CacheStats) {
    print!("{}", tags);
    eprintln!("{}", format_cache_summary(stats));
}

// ============================================================================
// JSON inventory
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Inventory {
    pub groups: Vec<GroupSummary>,
    pub scripts: Vec<AssetSummary>,
    pub styles: Vec<AssetSummary>,
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub includes: Vec<String>,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetSummary {
    pub name: String,
    pub file: String,
    pub url: String,
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub groups: Vec<String>,
    pub requires: Vec<String>,
    pub cache: bool,
    pub minify: bool,
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        Self {
            name: asset.name().to_string(),
            file: asset.file().to_string(),
            url: asset.source().url().to_string(),
            remote: asset.is_remote(),
            media: (asset.kind() == AssetKind::Style).then(|| asset.media().to_string()),
            groups: asset.groups().iter().cloned().collect(),
            requires: asset.requires().to_vec(),
            cache: asset.is_cacheable(),
            minify: asset.is_minify_eligible(),
        }
    }
}

impl Inventory {
    pub fn from_registry(registry: &AssetRegistry) -> Self {
        let summaries = |kind: AssetKind| -> Vec<AssetSummary> {
            registry
                .assets(kind)
                .values()
                .map(AssetSummary::from)
                .collect()
        };
        Self {
            groups: registry
                .groups()
                .values()
                .map(|g| GroupSummary {
                    name: g.name.clone(),
                    includes: g.included_groups.iter().cloned().collect(),
                    scripts: g.scripts.iter().cloned().collect(),
                    styles: g.styles.iter().cloned().collect(),
                })
                .collect(),
            scripts: summaries(AssetKind::Script),
            styles: summaries(AssetKind::Style),
        }
    }
}
