//! Network-first: pages.

use swcache_core::Error;

use super::StrategyContext;
use crate::request::Request;
use crate::response::Response;

/// Fetch from the network, falling back to the stored page, then the stored root.
///
/// A live response is returned without waiting for its store write.
///
/// # Errors
///
/// Returns `Error::OfflineNavigation` when the network rejects and neither
/// the page nor `/` is stored. The worker stays healthy; only this
/// navigation fails.
pub async fn network_first(request: &Request, ctx: &StrategyContext) -> Result<Response, Error> {
    let network_error = match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store_in_background(request, &response);
            return Ok(response);
        }
        Err(e) => e,
    };

    tracing::info!(url = %request.url, error = %network_error, "navigation offline, trying cache");

    if let Some(cached) = ctx.lookup(request).await {
        return Ok(cached);
    }

    let mut root = request.url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    let root_request = Request::navigate(root);

    if let Some(cached) = ctx.lookup(&root_request).await {
        tracing::debug!(url = %request.url, "serving stored root document");
        return Ok(cached);
    }

    tracing::warn!(url = %request.url, "no stored page or root document for offline navigation");
    Err(Error::OfflineNavigation(request.url.to_string()))
}
