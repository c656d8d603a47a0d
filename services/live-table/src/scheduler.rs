//! Tokio-backed [`Scheduler`] and the loop that delivers fired timers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dicearena_execution::{
    DieSourceError, PrefetchedDice, Scheduler, Timer, TimerHandle, TimerKind,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::dice::prefetch_dice;
use crate::now_ms;
use crate::registry::ArenaRegistry;

type Tasks = Arc<Mutex<HashMap<u64, AbortHandle>>>;

fn lock(tasks: &Tasks) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Each scheduled timer is a sleeping task that sends its token on a channel
/// when it wakes. Cancelling aborts the task.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Tasks,
    fired: mpsc::UnboundedSender<Timer>,
}

impl TokioScheduler {
    /// Returns the scheduler and the receiving end of fired timers.
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<Timer>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            fired,
        };
        (scheduler, receiver)
    }

    /// Timers that have neither fired nor been cancelled.
    pub fn pending_count(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = self.tasks.clone();
        let fired = self.fired.clone();

        // Hold the map until the handle is stored so the task cannot finish
        // and remove itself first.
        let mut pending = lock(&self.tasks);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&tasks).remove(&id);
            if fired.send(timer).is_err() {
                debug!(?timer, "timer receiver closed");
            }
        });
        pending.insert(id, task.abort_handle());
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = lock(&self.tasks).remove(&handle.0) {
            task.abort();
        }
    }
}

/// Deliver fired timers to their arenas until the channel closes.
///
/// Each delivery runs on its own task. Roll timers draw their dice first,
/// outside any arena lock.
pub async fn dispatch_timers(
    mut fired: mpsc::UnboundedReceiver<Timer>,
    registry: Arc<ArenaRegistry>,
    die_timeout: Duration,
) {
    while let Some(timer) = fired.recv().await {
        let registry = registry.clone();
        tokio::spawn(async move {
            let dice = match timer.kind {
                TimerKind::Roll { .. } => prefetch_dice(die_timeout).await,
                _ => PrefetchedDice::unavailable(DieSourceError::Unavailable(
                    "no roll pending".to_string(),
                )),
            };
            registry.fire(timer, dice, now_ms());
        });
    }
    debug!("timer dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(match_id: u64) -> Timer {
        Timer {
            chat_id: -1,
            generation: 1,
            kind: TimerKind::CloseBetting { match_id },
        }
    }

    #[tokio::test]
    async fn test_timer_fires_after_delay() {
        let (scheduler, mut fired) = TokioScheduler::new(Handle::current());
        scheduler.schedule(Duration::from_millis(20), timer(1));
        assert_eq!(scheduler.pending_count(), 1);

        let received = tokio::time::timeout(Duration::from_secs(2), fired.recv())
            .await
            .expect("timer should fire")
            .expect("channel open");
        assert_eq!(received, timer(1));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_fires() {
        let (scheduler, mut fired) = TokioScheduler::new(Handle::current());
        let cancelled = scheduler.schedule(Duration::from_millis(20), timer(1));
        scheduler.schedule(Duration::from_millis(60), timer(2));
        scheduler.cancel(cancelled);
        // Cancelling twice is harmless.
        scheduler.cancel(cancelled);

        let received = tokio::time::timeout(Duration::from_secs(2), fired.recv())
            .await
            .expect("second timer should fire")
            .expect("channel open");
        assert_eq!(received, timer(2));
    }

    #[tokio::test]
    async fn test_cancel_after_fire_is_noop() {
        let (scheduler, mut fired) = TokioScheduler::new(Handle::current());
        let handle = scheduler.schedule(Duration::from_millis(1), timer(1));
        fired.recv().await.expect("fired");
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
