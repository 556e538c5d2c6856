use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::runtime::{entity::Sensor, state_store::StateStore, timer::Tick};
use crate::scheduling::{
    poll_scheduler::PollScheduler, schedule_context::ScheduleContext, types::ScheduleDecision,
};

/// Runs one entity: refresh on every tick of its current timer, publish, then let
/// the scheduler react to the published market state.
pub struct EntityDriver {
    sensor: Box<dyn Sensor>,
    scheduler: PollScheduler,
    store: StateStore,
    market_entity_id: String,
    ticks: mpsc::Receiver<Tick>,
}

impl EntityDriver {
    pub fn new(
        sensor: Box<dyn Sensor>,
        scheduler: PollScheduler,
        store: StateStore,
        market_entity_id: impl Into<String>,
        ticks: mpsc::Receiver<Tick>,
    ) -> Self {
        Self {
            sensor,
            scheduler,
            store,
            market_entity_id: market_entity_id.into(),
            ticks,
        }
    }

    pub fn entity_id(&self) -> &str {
        self.sensor.entity_id()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// One poll. Returns `false` when the entity was detached while the provider call was in flight.
    pub async fn tick(&mut self, detached: &CancellationToken) -> bool {
        self.sensor.refresh(Utc::now()).await;

        if detached.is_cancelled() {
            debug!(entity_id = %self.entity_id(), "dropping refresh result of detached entity");
            return false;
        }

        self.store.publish(
            self.sensor.entity_id(),
            self.sensor.state(),
            self.sensor.attributes(),
            self.sensor.availability(),
        );

        let context = ScheduleContext {
            market_open: self.store.binary_state(&self.market_entity_id),
            current: self.scheduler.cadence(),
        };
        let decision = self.scheduler.on_tick(&context);
        debug!(entity_id = %self.entity_id(), ?decision, "tick complete");

        if let ScheduleDecision::Reconfigure(_) = decision {
            /* NOTE: a pending tick of the released timer would otherwise hold the only slot and drop the new timer's first tick */
            while self.ticks.try_recv().is_ok() {}
        }

        true
    }

    pub async fn run(mut self, detached: CancellationToken) {
        self.scheduler.attach();
        info!(entity_id = %self.entity_id(), name = %self.sensor.name(), "entity attached");

        let mut attached = self.tick(&detached).await;

        while attached {
            tokio::select! {
                biased;
                _ = detached.cancelled() => attached = false,
                tick = self.ticks.recv() => match tick {
                    Some(tick) if self.scheduler.is_current(tick.timer_id) => {
                        attached = self.tick(&detached).await;
                    }
                    Some(tick) => {
                        debug!(entity_id = %self.entity_id(), timer_id = tick.timer_id, "ignoring tick of released timer");
                    }
                    None => attached = false,
                },
            }
        }

        self.scheduler.detach();
        info!(entity_id = %self.entity_id(), "entity detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::runtime::entity::{Availability, StateValue};
    use crate::scheduling::types::{CadenceIntervals, PollCadence, PollPlan};
    use crate::sensors::available_funds::AvailableFundsSensor;
    use crate::testing::{FakeProvider, RecordingTimers};

    const MARKET: &str = "binary_sensor.market";

    fn funds_driver(
        provider: Arc<FakeProvider>,
        store: &StateStore,
        timers: &Arc<RecordingTimers>,
    ) -> (EntityDriver, mpsc::Sender<Tick>) {
        let sensor = AvailableFundsSensor::new(provider, "123456789");
        let plan = PollPlan::FollowMarket {
            intervals: CadenceIntervals::default(),
            initial: PollCadence::Slow,
        };
        let mut scheduler = PollScheduler::for_plan(sensor.entity_id().to_string(), plan, timers.clone());
        scheduler.attach();

        let (tx, rx) = mpsc::channel(1);
        let driver = EntityDriver::new(Box::new(sensor), scheduler, store.clone(), MARKET, rx);

        (driver, tx)
    }

    fn cash_account(amount: f64) -> serde_json::Value {
        json!({
            "securitiesAccount": {
                "accountId": "123456789",
                "type": "CASH",
                "currentBalances": { "cashAvailableForTrading": amount }
            }
        })
    }

    #[tokio::test]
    async fn publishes_then_follows_market_state() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(523.10)));
        provider.push_account(Ok(cash_account(523.10)));
        let store = StateStore::new();
        let timers = Arc::new(RecordingTimers::default());
        let (mut driver, _ticks) = funds_driver(provider, &store, &timers);
        let detached = CancellationToken::new();

        store.publish(MARKET, StateValue::On, Default::default(), Availability::Available);

        assert!(driver.tick(&detached).await);
        assert!(driver.tick(&detached).await);

        let published = store.get("sensor.available_funds_6789").unwrap();
        assert_eq!(published.state, StateValue::Number(523.10));
        assert_eq!(driver.scheduler().cadence(), PollCadence::Fast);
        assert_eq!(driver.scheduler().reconfigurations(), 1);
        assert_eq!(
            timers.registered(),
            vec![Duration::from_secs(300), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn unavailable_market_keeps_cadence() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(1.0)));
        let store = StateStore::new();
        let timers = Arc::new(RecordingTimers::default());
        let (mut driver, _ticks) = funds_driver(provider, &store, &timers);

        store.publish(MARKET, StateValue::On, Default::default(), Availability::Unavailable);

        assert!(driver.tick(&CancellationToken::new()).await);
        assert_eq!(driver.scheduler().cadence(), PollCadence::Slow);
        assert_eq!(driver.scheduler().reconfigurations(), 0);
    }

    #[tokio::test]
    async fn result_of_detached_entity_is_discarded() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(42.0)));
        let store = StateStore::new();
        let timers = Arc::new(RecordingTimers::default());
        let (mut driver, _ticks) = funds_driver(provider, &store, &timers);

        let detached = CancellationToken::new();
        detached.cancel();

        assert!(!driver.tick(&detached).await);
        assert!(store.get("sensor.available_funds_6789").is_none());
    }

    #[tokio::test]
    async fn run_stops_and_releases_timer_on_detach() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(42.0)));
        let store = StateStore::new();
        let timers = Arc::new(RecordingTimers::default());
        let (driver, _ticks) = funds_driver(provider, &store, &timers);

        let detached = CancellationToken::new();
        let task = tokio::spawn(driver.run(detached.clone()));

        detached.cancel();
        task.await.unwrap();

        assert_eq!(timers.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_only_on_current_timer_ticks() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(1.0)));
        provider.push_account(Ok(cash_account(2.0)));
        provider.push_account(Ok(cash_account(3.0)));
        let store = StateStore::new();
        let mut changes = store.subscribe();
        let timers = Arc::new(RecordingTimers::default());
        let (driver, ticks) = funds_driver(provider.clone(), &store, &timers);
        let current = timers.last_id();

        let detached = CancellationToken::new();
        let task = tokio::spawn(driver.run(detached.clone()));

        let attached = changes.recv().await.unwrap();
        assert_eq!(attached.new.state, StateValue::Number(1.0));

        ticks.send(Tick { timer_id: current + 41 }).await.unwrap();
        let after_stale = tokio::time::timeout(Duration::from_secs(1), changes.recv()).await;
        assert!(after_stale.is_err());
        assert_eq!(provider.pending_accounts(), 2);

        ticks.send(Tick { timer_id: current }).await.unwrap();
        let polled = changes.recv().await.unwrap();
        assert_eq!(polled.new.state, StateValue::Number(2.0));
        assert_eq!(provider.pending_accounts(), 1);

        detached.cancel();
        task.await.unwrap();
        assert_eq!(timers.live_count(), 0);
    }

    #[tokio::test]
    async fn cadence_swap_clears_pending_tick_of_released_timer() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(cash_account(5.0)));
        let store = StateStore::new();
        let timers = Arc::new(RecordingTimers::default());
        let (mut driver, ticks) = funds_driver(provider, &store, &timers);
        let slow = timers.last_id();

        store.publish(MARKET, StateValue::On, Default::default(), Availability::Available);
        ticks.try_send(Tick { timer_id: slow }).unwrap();

        assert!(driver.tick(&CancellationToken::new()).await);

        let fast = timers.last_id();
        assert_ne!(fast, slow);
        assert!(driver.scheduler().is_current(fast));
        assert!(ticks.try_send(Tick { timer_id: fast }).is_ok());
    }
}
