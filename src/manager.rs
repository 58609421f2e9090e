//! The asset manager: declarations in, HTML tags out.
//!
//! [`AssetManager`] owns the configuration, the [`Services`] bundle, the
//! [`AssetRegistry`] and the state of the current render pass. A typical
//! request looks like:
//!
//! ```text
//! declare (config / API)  →  load groups & assets  →  render()  →  reset()
//! ```
//!
//! ## Render pass
//!
//! Each kind moves through [`RenderPhase`]s independently. The emission
//! order is resolved once, then the tags are emitted once; asking for the
//! same kind again in the same pass yields an empty string. Loading more
//! assets after resolution (but before emission) invalidates the order.
//! [`AssetManager::reset`] starts a new pass and re-loads the default group.
//!
//! ## Output modes
//!
//! | Mode | Condition | Output |
//! |------|-----------|--------|
//! | Individual | `dev` or `!combine` | one tag per asset, cached artifacts still used |
//! | Combined | `!dev && combine` | one script bundle; one stylesheet bundle per media |
//!
//! A bundle that cannot be produced falls back to the individual tags of
//! its constituents. Stylesheets are always emitted in media precedence
//! order (`all`, `screen`, `print`, then the rest).

use crate::asset::{Asset, AssetError};
use crate::cache::{self, CacheStats};
use crate::combine;
use crate::config::{AssetEntry, AssetsConfig, ConfigError, GroupDecl};
use crate::context::{Context, Services};
use crate::order::emission_order;
use crate::registry::{AssetRegistry, RegistryError};
use crate::render::{join_tags, order_by_media, partition_by_media};
use crate::types::{AssetKind, DEFAULT_MEDIA};
use std::io;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    NotStarted,
    Resolved,
    Emitted,
}

#[derive(Debug, Default)]
struct KindPass {
    phase: RenderPhase,
    order: Vec<String>,
}

pub struct AssetManager {
    config: AssetsConfig,
    services: Services,
    stats: CacheStats,
    registry: AssetRegistry,
    script_pass: KindPass,
    style_pass: KindPass,
}

impl AssetManager {
    /// Manager over the real filesystem, HTTP and minifiers.
    pub fn new(config: AssetsConfig) -> Result<Self, ManagerError> {
        Self::with_services(config, Services::default())
    }

    /// Validate the config, declare its inventory and load the default group.
    pub fn with_services(config: AssetsConfig, services: Services) -> Result<Self, ManagerError> {
        config.validate()?;
        let mut manager = Self {
            config,
            services,
            stats: CacheStats::default(),
            registry: AssetRegistry::new(),
            script_pass: KindPass::default(),
            style_pass: KindPass::default(),
        };
        manager.declare_configured();
        manager.load_default_group()?;
        Ok(manager)
    }

    fn declare_configured(&mut self) {
        let groups = self.config.groups.clone();
        for (name, decl) in groups {
            self.declare_group(&name, decl);
        }
        let scripts = self.config.scripts.clone();
        for entry in scripts {
            self.declare(AssetKind::Script, entry);
        }
        let styles = self.config.styles.clone();
        for entry in styles {
            self.declare(AssetKind::Style, entry);
        }
    }

    fn load_default_group(&mut self) -> Result<(), ManagerError> {
        if let Some(group) = self.config.default_group.clone() {
            self.load_group(&group)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &AssetsConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Cache outcomes since the last reset.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn phase(&self, kind: AssetKind) -> RenderPhase {
        match kind {
            AssetKind::Script => self.script_pass.phase,
            AssetKind::Style => self.style_pass.phase,
        }
    }

    // =========================================================================
    // Declaration
    // =========================================================================

    fn declare(&mut self, kind: AssetKind, entry: AssetEntry) -> Option<String> {
        let cx = Context::new(&self.config, &self.services, &self.stats);
        self.registry.declare_asset(kind, entry.into_decl(), &cx)
    }

    /// Declare a script. Returns its name, or `None` if it was rejected.
    pub fn declare_script(&mut self, entry: impl Into<AssetEntry>) -> Option<String> {
        self.declare(AssetKind::Script, entry.into())
    }

    /// Declare a stylesheet. Returns its name, or `None` if it was rejected.
    pub fn declare_style(&mut self, entry: impl Into<AssetEntry>) -> Option<String> {
        self.declare(AssetKind::Style, entry.into())
    }

    pub fn declare_group(&mut self, name: &str, decl: GroupDecl) {
        let cx = Context::new(&self.config, &self.services, &self.stats);
        self.registry.declare_group(name, decl, &cx);
    }

    // =========================================================================
    // Loading
    // =========================================================================

    pub fn load_group(&mut self, name: &str) -> Result<(), ManagerError> {
        self.registry.load_group(name)?;
        self.invalidate(AssetKind::Script);
        self.invalidate(AssetKind::Style);
        Ok(())
    }

    pub fn load_scripts<I, S>(&mut self, names: I) -> Result<(), ManagerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.load_assets(AssetKind::Script, names)?;
        self.invalidate(AssetKind::Script);
        Ok(())
    }

    pub fn load_styles<I, S>(&mut self, names: I) -> Result<(), ManagerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.load_assets(AssetKind::Style, names)?;
        self.invalidate(AssetKind::Style);
        Ok(())
    }

    fn invalidate(&mut self, kind: AssetKind) {
        let pass = match kind {
            AssetKind::Script => &mut self.script_pass,
            AssetKind::Style => &mut self.style_pass,
        };
        match pass.phase {
            RenderPhase::Resolved => *pass = KindPass::default(),
            RenderPhase::Emitted => debug!(%kind, "already emitted this pass, load ignored"),
            RenderPhase::NotStarted => {}
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Final emission order for a kind, resolving it if necessary.
    ///
    /// Required names that were never registered are reported and left out.
    pub fn order(&mut self, kind: AssetKind) -> &[String] {
        let cx = Context::new(&self.config, &self.services, &self.stats);
        let pass = match kind {
            AssetKind::Script => &mut self.script_pass,
            AssetKind::Style => &mut self.style_pass,
        };
        if pass.phase == RenderPhase::NotStarted {
            pass.order = emission_order(self.registry.to_render(kind))
                .into_iter()
                .filter(|name| {
                    let known = self.registry.asset(kind, name).is_some();
                    if !known {
                        cx.report(&AssetError::MissingRequirement {
                            kind,
                            name: name.clone(),
                        });
                    }
                    known
                })
                .collect();
            pass.phase = RenderPhase::Resolved;
            debug!(%kind, order = ?pass.order, "resolved emission order");
        }
        &pass.order
    }

    /// Script tags for the current pass. Empty once already emitted.
    pub fn scripts(&mut self) -> String {
        self.emit(AssetKind::Script)
    }

    /// Stylesheet tags for the current pass. Empty once already emitted.
    pub fn styles(&mut self) -> String {
        self.emit(AssetKind::Style)
    }

    /// Stylesheets, then scripts.
    pub fn render(&mut self) -> String {
        let mut out = self.styles();
        out.push_str(&self.scripts());
        out
    }

    fn emit(&mut self, kind: AssetKind) -> String {
        if self.phase(kind) == RenderPhase::Emitted {
            return String::new();
        }
        self.order(kind);

        let cx = Context::new(&self.config, &self.services, &self.stats);
        let pass = match kind {
            AssetKind::Script => &mut self.script_pass,
            AssetKind::Style => &mut self.style_pass,
        };
        pass.phase = RenderPhase::Emitted;
        let assets: Vec<&Asset> = pass
            .order
            .iter()
            .filter_map(|name| self.registry.asset(kind, name))
            .collect();

        let tags = if self.config.combined() {
            combined_tags(&cx, kind, &assets)
        } else {
            individual_tags(&cx, kind, &assets)
        };
        join_tags(&tags)
    }

    /// Start a new pass: forget loads, phases, timestamps and stats, then
    /// load the default group again.
    pub fn reset(&mut self) -> Result<(), ManagerError> {
        self.registry.reset();
        self.script_pass = KindPass::default();
        self.style_pass = KindPass::default();
        self.stats.reset();
        self.load_default_group()
    }

    /// Remove every cached artifact and bundle. Returns how many were removed.
    pub fn clear_cache(&self) -> io::Result<usize> {
        let removed = cache::clear_cache(self.services.fs.as_ref(), &self.config.cache_path())?;
        Ok(removed.len())
    }
}

fn individual_tags(cx: &Context<'_>, kind: AssetKind, assets: &[&Asset]) -> Vec<String> {
    match kind {
        AssetKind::Script => assets.iter().map(|a| a.render_tag(cx)).collect(),
        AssetKind::Style => order_by_media(partition_by_media(assets.iter().copied(), |a| a.media()))
            .into_iter()
            .flat_map(|(_, group)| group)
            .map(|a| a.render_tag(cx))
            .collect(),
    }
}

fn combined_tags(cx: &Context<'_>, kind: AssetKind, assets: &[&Asset]) -> Vec<String> {
    if assets.is_empty() {
        return Vec::new();
    }
    let partitions = match kind {
        AssetKind::Script => vec![(DEFAULT_MEDIA.to_string(), assets.to_vec())],
        AssetKind::Style => {
            order_by_media(partition_by_media(assets.iter().copied(), |a| a.media()))
        }
    };

    let mut tags = Vec::with_capacity(partitions.len());
    for (media, group) in partitions {
        match combine::bundle_tag(cx, kind, &group, &media) {
            Ok(tag) => tags.push(tag),
            Err(e) => {
                cx.report(&e);
                tags.extend(individual_tags(cx, kind, &group));
            }
        }
    }
    tags
}
