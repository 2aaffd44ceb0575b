use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::controller::AttemptController;

/// Cancellable periodic tick owned by the controller.
///
/// The task holds only a weak reference, so dropping the controller ends
/// it. It also ends on its own once the attempt is locked.
pub(crate) struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Must be called from within a Tokio runtime. The first tick fires
    /// immediately.
    pub(crate) fn spawn(controller: Weak<AttemptController>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                let locked = match controller.tick() {
                    Ok(state) => state.is_locked(),
                    Err(e) => {
                        tracing::warn!(error = %e, "tick failed");
                        false
                    }
                };
                drop(controller);
                if locked {
                    tracing::debug!("attempt locked, stopping tick task");
                    break;
                }
            }
        });
        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub(crate) fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
