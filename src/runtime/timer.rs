use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tick {
    pub timer_id: u64,
}

/// A recurring callback registration. Released explicitly with [`TimerHandle::cancel`].
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
    every: Duration,
    cancel: CancellationToken,
}

impl TimerHandle {
    pub fn new(id: u64, every: Duration, cancel: CancellationToken) -> Self {
        Self { id, every, cancel }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub trait TimerService: Send + Sync {
    fn register(&self, every: Duration) -> TimerHandle;
}

/// Timer service for one entity: every registration feeds ticks into the entity's channel.
///
/// Registrations are children of the entity's detach token, so detaching the
/// entity releases them even while a tick is still in flight.
pub struct IntervalTimers {
    ticks: mpsc::Sender<Tick>,
    detached: CancellationToken,
    next_id: AtomicU64,
}

impl IntervalTimers {
    pub fn new(ticks: mpsc::Sender<Tick>, detached: CancellationToken) -> Self {
        Self {
            ticks,
            detached,
            next_id: AtomicU64::new(0),
        }
    }
}

impl TimerService for IntervalTimers {
    fn register(&self, every: Duration) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.detached.child_token();

        let token = cancel.clone();
        let ticks = self.ticks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => match ticks.try_send(Tick { timer_id: id }) {
                        /* NOTE: a full channel means a tick is already pending, this one coalesces into it */
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Closed(_)) => break,
                    },
                }
            }
        });

        TimerHandle::new(id, every, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delivers_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(1);
        let timers = IntervalTimers::new(tx, CancellationToken::new());

        let handle = timers.register(Duration::from_secs(10));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.timer_id, handle.id());

        handle.cancel();
        let after_cancel = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(after_cancel.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn detaching_releases_every_registration() {
        let (tx, mut rx) = mpsc::channel(1);
        let detached = CancellationToken::new();
        let timers = IntervalTimers::new(tx, detached.clone());

        let first = timers.register(Duration::from_secs(10));
        let second = timers.register(Duration::from_secs(300));
        assert_ne!(first.id(), second.id());

        detached.cancel();

        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        let after_detach = tokio::time::timeout(Duration::from_secs(600), rx.recv()).await;
        assert!(after_detach.is_err());
    }
}
