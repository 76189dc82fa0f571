//! Declarative adapter selection table.

use tracing::debug;
use url::Url;

use super::{
    DoubanAdapter, FanzaAdapter, HuiavAdapter, IafdAdapter, MetArtAdapter, SiteAdapter,
    VixenAdapter, WowNetworkAdapter,
};

/// Maps the current page's origin and path shape to the applicable site
/// adapter. At most one adapter is active per concrete page type; a page
/// nobody claims simply has no extraction offered.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adapter; earlier registrations win on overlap.
    pub fn register(&mut self, adapter: Box<dyn SiteAdapter>) {
        self.adapters.push(adapter);
    }

    /// Selects the adapter for a page URL, if any claims it.
    #[must_use]
    pub fn select(&self, url: &Url) -> Option<&dyn SiteAdapter> {
        let selected = self
            .adapters
            .iter()
            .find(|adapter| adapter.matches(url))
            .map(Box::as_ref);
        match selected {
            Some(adapter) => debug!(adapter = adapter.name(), url = %url, "adapter selected"),
            None => debug!(url = %url, "no adapter claims this page"),
        }
        selected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Builds the registry with every known site adapter registered.
#[must_use]
pub fn build_default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Box::new(DoubanAdapter::new()));
    registry.register(Box::new(FanzaAdapter::new()));
    registry.register(Box::new(MetArtAdapter::new()));
    registry.register(Box::new(VixenAdapter::new()));
    registry.register(Box::new(WowNetworkAdapter::new()));
    registry.register(Box::new(IafdAdapter::new()));
    registry.register(Box::new(HuiavAdapter::new()));
    registry
}
