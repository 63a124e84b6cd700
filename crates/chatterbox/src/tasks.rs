//! Background maintenance loops.
//!
//! Two periodic tasks run alongside the event loop: an autosave sweep
//! that flushes every chat to the store, and a mood drift pass. Both
//! stop promptly when the shared [`CancellationToken`] fires; the
//! event loop performs a final save after cancelling them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::service::BotService;

/// Spawn the autosave and mood-cycle loops.
pub fn spawn(service: Arc<BotService>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(autosave_loop(Arc::clone(&service), cancel.clone())),
        tokio::spawn(mood_loop(service, cancel)),
    ]
}

async fn autosave_loop(service: Arc<BotService>, cancel: CancellationToken) {
    let period = Duration::from_secs(service.config().tasks.save_interval_secs);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so startup does not
    // write back what was just loaded.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("autosave task stopping");
                return;
            }
            _ = ticker.tick() => {
                let (saved, failed) = service.save_all().await;
                if failed > 0 {
                    warn!(saved, failed, "autosave sweep finished with failures");
                } else {
                    debug!(saved, "autosave sweep finished");
                }
            }
        }
    }
}

async fn mood_loop(service: Arc<BotService>, cancel: CancellationToken) {
    let period = Duration::from_secs(service.config().tasks.mood_interval_secs);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("mood task stopping");
                return;
            }
            _ = ticker.tick() => {
                service.cycle_moods().await;
            }
        }
    }
}
