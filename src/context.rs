//! Capabilities and per-pass context lent to assets.
//!
//! Nothing in the crate reaches for global state. The manager owns one
//! [`Services`] bundle (filesystem, fetcher, minifier, failure callback) and
//! hands assets a borrowed [`Context`] pairing it with the configuration and
//! the pass's cache counters.

use crate::asset::AssetError;
use crate::cache::CacheStats;
use crate::config::AssetsConfig;
use crate::fetch::{HttpFetcher, RemoteFetcher};
use crate::fs::{Filesystem, LocalFs};
use crate::minify::{Minifier, StandardMinifier};
use tracing::warn;

/// Callback invoked for every recoverable failure, after it is logged.
pub type FailureCallback = Box<dyn Fn(&AssetError)>;

/// The external capabilities the pipeline consumes.
pub struct Services {
    pub fs: Box<dyn Filesystem>,
    pub fetcher: Box<dyn RemoteFetcher>,
    pub minifier: Box<dyn Minifier>,
    pub on_failure: Option<FailureCallback>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            fs: Box::new(LocalFs),
            fetcher: Box::new(HttpFetcher),
            minifier: Box::new(StandardMinifier),
            on_failure: None,
        }
    }
}

impl Services {
    pub fn with_fs(mut self, fs: impl Filesystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }

    pub fn on_failure(mut self, callback: impl Fn(&AssetError) + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }
}

/// Borrowed view of everything an asset needs to resolve, cache and render itself.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a AssetsConfig,
    pub services: &'a Services,
    pub stats: &'a CacheStats,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a AssetsConfig, services: &'a Services, stats: &'a CacheStats) -> Self {
        Self {
            config,
            services,
            stats,
        }
    }

    pub fn fs(&self) -> &'a dyn Filesystem {
        self.services.fs.as_ref()
    }

    pub fn fetcher(&self) -> &'a dyn RemoteFetcher {
        self.services.fetcher.as_ref()
    }

    pub fn minifier(&self) -> &'a dyn Minifier {
        self.services.minifier.as_ref()
    }

    /// Failure channel: log, then hand the error to the user callback.
    pub fn report(&self, error: &AssetError) {
        warn!(%error, "asset failure");
        if let Some(callback) = &self.services.on_failure {
            callback(error);
        }
    }
}
