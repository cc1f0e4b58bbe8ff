//! Cache-first: media and static assets.

use super::StrategyContext;
use crate::request::Request;
use crate::response::Response;

/// Serve the stored snapshot without touching the network; on a miss,
/// fetch and keep a copy of cacheable responses.
///
/// Never fails: a rejected fetch becomes [`Response::offline_placeholder`].
pub async fn cache_first(request: &Request, ctx: &StrategyContext) -> Response {
    if let Some(cached) = ctx.lookup(request).await {
        return cached;
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            if !ctx.store_in_background(request, &response) {
                tracing::debug!(
                    url = %request.url,
                    status = response.status,
                    response_type = %response.response_type,
                    "not caching response"
                );
            }
            response
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "asset unavailable offline");
            Response::offline_placeholder()
        }
    }
}
