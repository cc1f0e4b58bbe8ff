//! Stale-while-revalidate: scripts, styles, data.

use tokio::sync::oneshot;

use super::StrategyContext;
use crate::request::Request;
use crate::response::Response;

/// Return the stored snapshot at once while refreshing it from the network.
///
/// The network leg starts before the lookup and keeps running after a
/// cached response has been returned; its store write is a detached task.
/// With no snapshot the network outcome is awaited, and a rejected fetch
/// yields [`Response::network_error`].
pub async fn stale_while_revalidate(request: &Request, ctx: &StrategyContext) -> Response {
    let (tx, rx) = oneshot::channel();

    let revalidate = ctx.clone();
    let owned = request.clone();
    ctx.background.spawn(async move {
        match revalidate.network.fetch(&owned).await {
            Ok(response) => {
                revalidate.store_in_background(&owned, &response);
                let _ = tx.send(Some(response));
            }
            Err(e) => {
                tracing::warn!(url = %owned.url, error = %e, "revalidation fetch failed");
                let _ = tx.send(None);
            }
        }
    });

    if let Some(cached) = ctx.lookup(request).await {
        return cached;
    }

    match rx.await {
        Ok(Some(response)) => response,
        _ => Response::network_error(),
    }
}
