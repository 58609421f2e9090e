//! Declared assets, named groups, and the per-pass load state.
//!
//! The registry is the only owner of [`Asset`] values. Declarations index an
//! asset by name and by every group it names (groups spring into existence
//! on first reference). Loading walks groups depth-first into the
//! `to_render` working sets that [`order::emission_order`](crate::order)
//! later flattens.
//!
//! ## Loading rules
//!
//! - Loading is idempotent: a name already in `to_render`, or a group
//!   already in `loaded_groups`, is skipped.
//! - A group is marked loaded *before* its included groups are walked, so
//!   self-inclusion and mutual inclusion terminate.
//! - Included groups load first, then the group's styles, then its scripts.
//! - A load that fails leaves the load state exactly as it was.
//! - Asking for a group or asset that was never declared is a caller error
//!   ([`RegistryError`]). Asking for an asset whose declaration failed (its
//!   file was missing, say) is silently skipped: that failure was already
//!   reported.

use crate::asset::Asset;
use crate::config::{AssetDecl, AssetEntry, GroupDecl};
use crate::context::Context;
use crate::naming::derive_asset_name;
use crate::types::AssetKind;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),
    #[error("Unknown {kind} '{name}'")]
    UnknownAsset { kind: AssetKind, name: String },
}

/// A named collection of assets and included groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub scripts: IndexSet<String>,
    pub styles: IndexSet<String>,
    pub included_groups: IndexSet<String>,
}

impl Group {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn members(&self, kind: AssetKind) -> &IndexSet<String> {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
        }
    }

    fn members_mut(&mut self, kind: AssetKind) -> &mut IndexSet<String> {
        match kind {
            AssetKind::Script => &mut self.scripts,
            AssetKind::Style => &mut self.styles,
        }
    }
}

/// Working set of the current render pass.
#[derive(Debug, Default, Clone)]
pub struct LoadState {
    scripts: IndexMap<String, Vec<String>>,
    styles: IndexMap<String, Vec<String>>,
    loaded_groups: IndexSet<String>,
}

impl LoadState {
    pub fn to_render(&self, kind: AssetKind) -> &IndexMap<String, Vec<String>> {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
        }
    }

    fn to_render_mut(&mut self, kind: AssetKind) -> &mut IndexMap<String, Vec<String>> {
        match kind {
            AssetKind::Script => &mut self.scripts,
            AssetKind::Style => &mut self.styles,
        }
    }

    pub fn loaded_groups(&self) -> &IndexSet<String> {
        &self.loaded_groups
    }
}

#[derive(Debug, Default)]
pub struct AssetRegistry {
    scripts: IndexMap<String, Asset>,
    styles: IndexMap<String, Asset>,
    groups: IndexMap<String, Group>,
    /// Names whose declaration failed, so loads can skip them quietly.
    rejected: HashSet<(AssetKind, String)>,
    state: LoadState,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn assets_mut(&mut self, kind: AssetKind) -> &mut IndexMap<String, Asset> {
        match kind {
            AssetKind::Script => &mut self.scripts,
            AssetKind::Style => &mut self.styles,
        }
    }

    /// All registered assets of a kind, in declaration order.
    pub fn assets(&self, kind: AssetKind) -> &IndexMap<String, Asset> {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
        }
    }

    pub fn asset(&self, kind: AssetKind, name: &str) -> Option<&Asset> {
        self.assets(kind).get(name)
    }

    pub fn groups(&self) -> &IndexMap<String, Group> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn to_render(&self, kind: AssetKind) -> &IndexMap<String, Vec<String>> {
        self.state.to_render(kind)
    }

    pub fn is_rejected(&self, kind: AssetKind, name: &str) -> bool {
        self.rejected.contains(&(kind, name.to_string()))
    }

    fn group_entry(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name))
    }

    /// Declare an asset and index it by name and groups.
    ///
    /// Returns the registered name, or `None` when the declaration failed
    /// (the failure goes through the context's failure channel). Declaring
    /// an existing name only unions the new groups into it.
    pub fn declare_asset(
        &mut self,
        kind: AssetKind,
        decl: AssetDecl,
        cx: &Context<'_>,
    ) -> Option<String> {
        let name = match decl.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => derive_asset_name(decl.file.trim(), kind),
        };

        if !name.is_empty()
            && let Some(existing) = self.assets_mut(kind).get_mut(&name)
        {
            let added = existing.add_to_groups(decl.all_groups());
            for group in added {
                self.group_entry(&group).members_mut(kind).insert(name.clone());
            }
            return Some(name);
        }

        match Asset::new(kind, decl, cx.config, cx.fs()) {
            Ok(asset) => {
                let name = asset.name().to_string();
                let groups: Vec<String> = asset.groups().iter().cloned().collect();
                debug!(%kind, asset = %name, ?groups, "declared asset");
                for group in &groups {
                    self.group_entry(group).members_mut(kind).insert(name.clone());
                }
                self.rejected.remove(&(kind, name.clone()));
                self.assets_mut(kind).insert(name.clone(), asset);
                Some(name)
            }
            Err(e) => {
                cx.report(&e);
                if !name.is_empty() {
                    self.rejected.insert((kind, name));
                }
                None
            }
        }
    }

    /// Declare (or extend) a group and every member it lists.
    pub fn declare_group(&mut self, name: &str, decl: GroupDecl, cx: &Context<'_>) {
        let group = self.group_entry(name);
        for included in &decl.groups {
            if !included.is_empty() {
                group.included_groups.insert(included.clone());
            }
        }
        for (kind, entries) in [
            (AssetKind::Style, decl.styles),
            (AssetKind::Script, decl.scripts),
        ] {
            for entry in entries {
                self.declare_member(name, kind, entry, cx);
            }
        }
    }

    fn declare_member(&mut self, group: &str, kind: AssetKind, entry: AssetEntry, cx: &Context<'_>) {
        // a bare file already registered under another name joins that asset
        let registered = match &entry {
            AssetEntry::File(file) => self
                .assets(kind)
                .values()
                .find(|a| a.file() == file.trim())
                .map(|a| a.name().to_string()),
            AssetEntry::Decl(_) => None,
        };
        let mut decl = entry.into_decl();
        if registered.is_some() {
            decl.name = registered;
        }
        if !decl.groups.iter().any(|g| g == group) {
            decl.groups.push(group.to_string());
        }
        let declared = self.declare_asset(kind, decl.clone(), cx);
        // keep the member listed even when its declaration failed
        let name = declared.unwrap_or_else(|| match decl.name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => derive_asset_name(decl.file.trim(), kind),
        });
        if !name.is_empty() {
            self.group_entry(group).members_mut(kind).insert(name);
        }
    }

    /// Activate a group for the current pass.
    ///
    /// On error nothing from this call stays loaded, so a retry fails the
    /// same way.
    pub fn load_group(&mut self, name: &str) -> Result<(), RegistryError> {
        let before = self.state.clone();
        let result = self.walk_group(name);
        if result.is_err() {
            self.state = before;
        }
        result
    }

    fn walk_group(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.state.loaded_groups.contains(name) {
            return Ok(());
        }
        let group = self
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownGroup(name.to_string()))?;
        self.state.loaded_groups.insert(name.to_string());
        debug!(group = %name, "loading group");

        for included in &group.included_groups {
            self.walk_group(included)?;
        }
        for kind in [AssetKind::Style, AssetKind::Script] {
            for member in group.members(kind) {
                self.load_member(kind, member);
            }
        }
        Ok(())
    }

    /// Activate individual assets for the current pass.
    pub fn load_assets<I, S>(&mut self, kind: AssetKind, names: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.assets(kind).contains_key(name) && !self.is_rejected(kind, name) {
                return Err(RegistryError::UnknownAsset {
                    kind,
                    name: name.to_string(),
                });
            }
            self.load_member(kind, name);
        }
        Ok(())
    }

    fn load_member(&mut self, kind: AssetKind, name: &str) {
        if self.state.to_render(kind).contains_key(name) {
            return;
        }
        let Some(asset) = self.assets(kind).get(name) else {
            debug!(%kind, asset = %name, "skipping asset that failed to declare");
            return;
        };
        let requires = asset.requires().to_vec();
        self.state.to_render_mut(kind).insert(name.to_string(), requires);
    }

    /// Forget everything loaded in the current pass.
    pub fn reset(&mut self) {
        self.state = LoadState::default();
        for asset in self.scripts.values().chain(self.styles.values()) {
            asset.forget_modified_at();
        }
    }
}
