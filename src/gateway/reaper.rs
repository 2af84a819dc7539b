use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::registry::SessionRegistry;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

// tokio intervals reject a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(10);

// -----------------------------------------------------------------------------
// ----- IdleReaper ------------------------------------------------------------

/// Background task that periodically evicts idle sessions from a registry.
#[derive(Debug)]
pub struct IdleReaper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl IdleReaper {
    pub fn spawn(registry: Arc<SessionRegistry>) -> Self {
        let period = registry.settings().reaper_period().max(MIN_PERIOD);
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(
            "idle reaper sweeping every {} (idle threshold {})",
            humantime::format_duration(period),
            humantime::format_duration(registry.settings().idle_timeout)
        );

        let task = tokio::spawn(run(registry, period, stop_rx));

        Self {
            stop: stop_tx,
            task,
        }
    }

    /// Stop sweeping and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Task --------------------------------------------------------

async fn run(registry: Arc<SessionRegistry>, period: Duration, mut stop: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let evicted = registry.sweep_idle(Instant::now());
                debug!("idle sweep evicted {evicted} session(s)");
            }
        }
    }

    debug!("idle reaper stopped");
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
