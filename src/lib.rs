//! # Simple Assets
//!
//! Declarative script and stylesheet management for server-rendered pages.
//! Assets are declared once (in `assets.toml` or through the API), grouped,
//! and loaded per request; rendering emits the `<script>` and `<link>` tags
//! in dependency order, served from minified cache artifacts or combined
//! bundles that rebuild themselves when a source changes.
//!
//! # Architecture: Declare, Load, Render
//!
//! ```text
//! 1. Declare   assets.toml / API  →  registry      (name → Asset, group → members)
//! 2. Load      groups, names      →  to_render     (name → requires, per kind)
//! 3. Render    to_render          →  HTML tags     (ordered, cached, combined)
//! ```
//!
//! Declarations live for the lifetime of the [`manager::AssetManager`];
//! loads and emissions belong to one render pass and are cleared by
//! [`manager::AssetManager::reset`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manager`] | The façade: declarations, loading, render passes, cache clearing |
//! | [`registry`] | Owns assets and groups; resolves group loads into working sets |
//! | [`asset`] | One script or stylesheet: resolution, artifact, contents, tag |
//! | [`order`] | Emission order from the loaded `name → requires` sets |
//! | [`combine`] | Bundles: identity, freshness, rebuild, bundle tags |
//! | [`cache`] | Artifact naming, version stamps, writes, cache clearing, stats |
//! | [`render`] | Pure tag formatting and stylesheet media precedence |
//! | [`markers`] | `{base_url}`-style URL markers substituted into sources |
//! | [`config`] | `assets.toml` loading, layering and validation |
//! | [`context`] | The capability bundle and the per-pass context lent to assets |
//! | [`fs`] | Filesystem capability and freshness checks |
//! | [`fetch`] | Remote source retrieval |
//! | [`minify`] | Script and stylesheet minifiers |
//! | [`naming`] | Asset names from file references, URL joining |
//! | [`types`] | `AssetKind` and shared constants |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Global State
//!
//! Configuration and capabilities (filesystem, HTTP, minifiers, the failure
//! callback) are owned by the manager and lent to assets through a
//! [`context::Context`]. Tests swap any of them without touching process
//! state, and two managers with different configs can coexist.
//!
//! ## The Filesystem Is the Cache Index
//!
//! Artifacts have deterministic names and their mtimes decide freshness.
//! There is no manifest to get out of sync: deleting the cache directory is
//! always safe, and the next render rebuilds whatever it needs.
//!
//! ## Failures Degrade, Misuse Errors
//!
//! A missing file, a failed download or an unwritable cache never breaks a
//! page: the asset is dropped, served from its source URL, or left out of
//! its bundle, and the failure goes through [`context::Context::report`].
//! Only caller mistakes (loading a group or asset that was never declared)
//! come back as `Err`.
//!
//! ## Reference-Count Ordering
//!
//! Emission order is a reference-count heuristic rather than a topological
//! sort (see [`order`]). Pages rely on the exact order it produces, so it is
//! kept.

pub mod asset;
pub mod cache;
pub mod combine;
pub mod config;
pub mod context;
pub mod fetch;
pub mod fs;
pub mod manager;
pub mod markers;
pub mod minify;
pub mod naming;
pub mod order;
pub mod output;
pub mod registry;
pub mod render;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
