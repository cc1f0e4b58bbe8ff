//! Caching strategies.
//!
//! Each strategy is a small protocol between the current generation and
//! the network. All network and store failures are handled here; the only
//! error that leaves this module is `Error::OfflineNavigation`.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

use std::sync::Arc;
use swcache_core::{Error, Generation};

use crate::background::BackgroundTasks;
use crate::fetch::Network;
use crate::request::Request;
use crate::response::Response;
use crate::router::StrategyTag;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

/// Everything a strategy needs to serve one request.
#[derive(Clone)]
pub struct StrategyContext {
    pub network: Arc<dyn Network>,
    pub generation: Generation,
    pub background: BackgroundTasks,
}

impl StrategyContext {
    pub fn new(network: Arc<dyn Network>, generation: Generation, background: BackgroundTasks) -> Self {
        Self { network, generation, background }
    }

    /// Look up the request in the current generation.
    ///
    /// Store errors count as a miss.
    pub(crate) async fn lookup(&self, request: &Request) -> Option<Response> {
        if !request.is_cacheable_method() {
            return None;
        }

        let key = request.key();
        match self.generation.match_request(&key.method, &key.url).await {
            Ok(found) => found.map(Response::from),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write a copy of the response in the background, if it may be stored.
    ///
    /// Returns whether a write was scheduled.
    pub(crate) fn store_in_background(&self, request: &Request, response: &Response) -> bool {
        if !request.is_cacheable_method() || !response.is_cacheable() {
            return false;
        }

        let stored = response.to_stored(request);
        let generation = self.generation.clone();
        self.background.spawn(async move {
            if let Err(e) = generation.put(&stored).await {
                tracing::warn!(url = %stored.url, error = %e, "cache write failed");
            }
        });
        true
    }
}

/// Run the strategy named by `tag`.
pub async fn execute(tag: StrategyTag, request: &Request, ctx: &StrategyContext) -> Result<Response, Error> {
    tracing::debug!(url = %request.url, strategy = tag.as_str(), "serving request");
    match tag {
        StrategyTag::NetworkFirst => network_first(request, ctx).await,
        StrategyTag::CacheFirst => Ok(cache_first(request, ctx).await),
        StrategyTag::StaleWhileRevalidate => Ok(stale_while_revalidate(request, ctx).await),
    }
}
