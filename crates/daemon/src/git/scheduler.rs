// Auto-commit timer.
//
// At most one live timer task. The first tick fires one period after arming,
// then every period. Each tick runs in its own task so a failed or panicking
// commit never ends the timer. The timer holds only a weak reference to its
// target and stops once the target is gone.

use std::future::Future;
use std::sync::{Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Something the timer can commit on each tick.
pub trait AutoCommitTarget: Send + Sync + 'static {
    fn auto_commit(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

struct LiveTimer {
    period: Duration,
    task: JoinHandle<()>,
}

/// Owner of the single auto-commit timer.
#[derive(Default)]
pub struct AutoCommitScheduler {
    timer: Mutex<Option<LiveTimer>>,
}

impl AutoCommitScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, cancelling any live one first. Returns `false` without
    /// arming when called outside a tokio runtime.
    pub fn schedule<T: AutoCommitTarget>(&self, period: Duration, target: Weak<T>) -> bool {
        let mut slot = self.lock();
        if let Some(previous) = slot.take() {
            previous.task.abort();
            debug!(period_secs = previous.period.as_secs(), "cancelled previous auto-commit timer");
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "no tokio runtime, auto-commit timer not armed");
                return false;
            }
        };

        let first_tick = Instant::now() + period;
        let task = handle.spawn(timer_loop(first_tick, period, target));
        *slot = Some(LiveTimer { period, task });
        info!(period_secs = period.as_secs(), "auto-commit timer armed");
        true
    }

    /// Cancel the live timer. Returns whether one was live.
    ///
    /// A commit already dispatched by the timer runs to completion.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(timer) => {
                let was_live = !timer.task.is_finished();
                timer.task.abort();
                info!("auto-commit timer stopped");
                was_live
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().as_ref().is_some_and(|timer| !timer.task.is_finished())
    }

    /// Period of the live timer.
    pub fn period(&self) -> Option<Duration> {
        self.lock().as_ref().filter(|timer| !timer.task.is_finished()).map(|timer| timer.period)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<LiveTimer>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AutoCommitScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().take() {
            timer.task.abort();
        }
    }
}

async fn timer_loop<T: AutoCommitTarget>(first_tick: Instant, period: Duration, target: Weak<T>) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(target) = target.upgrade() else {
            debug!("auto-commit target dropped, timer exiting");
            break;
        };

        debug!(at = %daybook_common::time::now_timestamp(), "auto-commit tick");
        let tick = tokio::spawn(async move { target.auto_commit().await });
        match tick.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "auto-commit tick failed"),
            Err(e) => error!(error = %e, "auto-commit tick panicked"),
        }
    }
}
