use log::{debug, warn};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::controller::{TickOutcome, WeakController};

/// Stops the countdown task it belongs to. Dropping the handle stops it as well.
pub(crate) struct TickerHandle {
    generation: u64,
    shutdown_tx: oneshot::Sender<()>,
}

impl TickerHandle {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn shutdown(self) {
        debug!("stopping countdown ticker");
        let _ = self.shutdown_tx.send(());
    }
}

/// Spawn the 1 Hz countdown for an attempt.
///
/// The first tick lands one `period` after spawning. The task exits on shutdown,
/// when the attempt is dropped, when a tick reports nothing left to do, or after
/// the automatic submission it triggered has finished. On exit it clears its own
/// slot in the controller.
pub(crate) fn spawn(controller: WeakController, period: Duration, generation: u64) -> TickerHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        run(&controller, period, &mut shutdown_rx).await;
        if let Some(controller) = controller.upgrade() {
            controller.ticker_finished(generation);
        }
    });

    TickerHandle {
        generation,
        shutdown_tx,
    }
}

async fn run(
    controller: &WeakController,
    period: Duration,
    shutdown_rx: &mut oneshot::Receiver<()>,
) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                debug!("countdown ticker shut down");
                break;
            }
            _ = interval.tick() => {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                match controller.tick() {
                    TickOutcome::Running { .. } => {}
                    TickOutcome::Idle => break,
                    TickOutcome::Expired(auto) => {
                        if let Err(err) = auto.outcome().await {
                            warn!("automatic submission did not complete: {err}");
                        }
                        break;
                    }
                }
            }
        }
    }
}
