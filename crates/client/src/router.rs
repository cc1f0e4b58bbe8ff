//! Request classification.
//!
//! Rules, first match wins:
//! 1. Cross-origin: not intercepted
//! 2. Navigation: network-first
//! 3. Media destination or asset path: cache-first
//! 4. Anything else: stale-while-revalidate

use url::Url;

use crate::fetch::same_origin;
use crate::request::Request;

/// Caching strategy selected for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTag {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl StrategyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::NetworkFirst => "network-first",
            StrategyTag::CacheFirst => "cache-first",
            StrategyTag::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Leave the request to the host; no cache access at all.
    Passthrough,
    Strategy(StrategyTag),
}

/// Classifies requests for one origin.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    asset_prefixes: Vec<String>,
}

impl Router {
    pub fn new(origin: Url, asset_prefixes: Vec<String>) -> Self {
        Self { origin, asset_prefixes }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Pick the route for a request. Pure: touches neither store nor network.
    pub fn classify(&self, request: &Request) -> Route {
        if !same_origin(&self.origin, &request.url) {
            return Route::Passthrough;
        }

        if request.is_navigation() {
            return Route::Strategy(StrategyTag::NetworkFirst);
        }

        if request.destination.is_media() || self.is_asset_path(request.url.path()) {
            return Route::Strategy(StrategyTag::CacheFirst);
        }

        Route::Strategy(StrategyTag::StaleWhileRevalidate)
    }

    fn is_asset_path(&self, path: &str) -> bool {
        self.asset_prefixes.iter().any(|prefix| path.contains(prefix.as_str()))
    }
}
