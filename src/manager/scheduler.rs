use super::{FilterCacheManager, IngestionLog};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Runs `refresh_filters` forever on a tokio task: once after
/// `initial_delay`, then again `refresh_interval` after each run
/// finishes. A failed refresh is logged and the previous cache stays
/// published.
///
/// Abort the returned handle to stop refreshing.
pub fn spawn_refresher<L>(manager: Arc<FilterCacheManager<L>>) -> JoinHandle<()>
where
    L: IngestionLog + 'static,
{
    tokio::spawn(async move {
        let initial_delay = manager.config().initial_delay;
        let refresh_interval = manager.config().refresh_interval;
        info!(?initial_delay, ?refresh_interval, "starting batch filter refresher");

        tokio::time::sleep(initial_delay).await;
        loop {
            match manager.refresh_filters().await {
                Ok(outcome) => debug!(
                    new_batches = outcome.new_batches,
                    new_filters = outcome.new_filters,
                    "scheduled refresh finished"
                ),
                Err(e) => error!(error = %e, "Error found refreshing batch filters"),
            }
            tokio::time::sleep(refresh_interval).await;
        }
    })
}
