use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::service::offer_service::OfferService;

/// Periodic offer-expiry sweep. The sweep statement itself is idempotent,
/// so overlapping runs (restart, multiple instances) are harmless.
pub fn spawn_expiry_sweep(offer_service: Arc<OfferService>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));

        loop {
            ticker.tick().await;

            match offer_service.expire_sweep().await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!("expiry sweep flipped {} offer(s) to expired", count);
                }
                Err(e) => {
                    tracing::error!("expiry sweep failed: {}", e);
                }
            }
        }
    });
}
