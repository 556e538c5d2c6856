use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::runtime::{
    driver::EntityDriver, entity::Sensor, state_store::StateStore, timer::IntervalTimers,
};
use crate::scheduling::{poll_scheduler::PollScheduler, types::PollPlan};

const DETACH_GRACE: Duration = Duration::from_secs(5);

struct AttachedEntity {
    detached: CancellationToken,
    task: JoinHandle<()>,
}

/// Entity runtime for one configured entry: one driver task per attached entity.
pub struct Host {
    store: StateStore,
    market_entity_id: String,
    entities: HashMap<String, AttachedEntity>,
}

impl Host {
    pub fn new(store: StateStore, market_entity_id: impl Into<String>) -> Self {
        Self {
            store,
            market_entity_id: market_entity_id.into(),
            entities: HashMap::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn is_attached(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn attach(&mut self, sensor: Box<dyn Sensor>, plan: PollPlan) -> Result<()> {
        let entity_id = sensor.entity_id().to_string();
        if self.entities.contains_key(&entity_id) {
            bail!("entity {entity_id} is already attached");
        }

        let detached = CancellationToken::new();
        let (ticks_tx, ticks_rx) = mpsc::channel(1);
        let timers = Arc::new(IntervalTimers::new(ticks_tx, detached.clone()));
        let scheduler = PollScheduler::for_plan(entity_id.clone(), plan, timers);

        let driver = EntityDriver::new(
            sensor,
            scheduler,
            self.store.clone(),
            self.market_entity_id.clone(),
            ticks_rx,
        );
        let task = tokio::spawn(driver.run(detached.clone()));

        self.entities
            .insert(entity_id, AttachedEntity { detached, task });

        Ok(())
    }

    /// Cancels the entity's timers and waits briefly for its driver to stop.
    ///
    /// A provider call still in flight is left to finish on its own; its result is dropped.
    pub async fn detach(&mut self, entity_id: &str) -> bool {
        let Some(entity) = self.entities.remove(entity_id) else {
            return false;
        };

        stop(&self.store, entity_id, entity).await;
        true
    }

    pub async fn detach_all(&mut self) {
        let entities: Vec<_> = self.entities.drain().collect();
        let store = &self.store;

        join_all(
            entities
                .into_iter()
                .map(|(entity_id, entity)| async move { stop(store, &entity_id, entity).await }),
        )
        .await;
    }
}

/// Cancels the driver, then flags the entity unavailable so readers stop trusting its last value.
async fn stop(store: &StateStore, entity_id: &str, entity: AttachedEntity) {
    entity.detached.cancel();

    match tokio::time::timeout(DETACH_GRACE, entity.task).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!(%entity_id, error = %error, "entity driver ended abnormally"),
        Err(_) => warn!(%entity_id, "entity driver still busy after detach, leaving it to finish"),
    }

    store.mark_unavailable(entity_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::runtime::entity::{Attributes, Availability, StateValue};
    use crate::scheduling::types::{CadenceIntervals, PollCadence};
    use crate::sensors::{available_funds::AvailableFundsSensor, market_open::MarketOpenSensor};
    use crate::testing::FakeProvider;

    #[tokio::test]
    async fn attach_polls_immediately_and_detach_stops() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_account(Ok(json!({
            "securitiesAccount": { "type": "MARGIN", "currentBalances": { "availableFunds": 99.5 } }
        })));

        let mut host = Host::new(StateStore::new(), "binary_sensor.market");
        let mut changes = host.store().subscribe();

        let sensor = AvailableFundsSensor::new(provider.clone(), "000011112222");
        let plan = PollPlan::FollowMarket {
            intervals: CadenceIntervals::default(),
            initial: PollCadence::Slow,
        };
        host.attach(Box::new(sensor), plan).unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.entity_id, "sensor.available_funds_2222");
        assert_eq!(change.new.state, StateValue::Number(99.5));

        assert!(host.detach("sensor.available_funds_2222").await);
        assert!(!host.is_attached("sensor.available_funds_2222"));
        assert!(!host.detach("sensor.available_funds_2222").await);
    }

    #[tokio::test]
    async fn duplicate_attach_is_rejected() {
        let provider = Arc::new(FakeProvider::default());
        let mut host = Host::new(StateStore::new(), "binary_sensor.market");

        let plan = PollPlan::Fixed(Duration::from_secs(60));
        host.attach(Box::new(MarketOpenSensor::new(provider.clone(), "EQUITY")), plan)
            .unwrap();
        let again = host.attach(Box::new(MarketOpenSensor::new(provider, "EQUITY")), plan);

        assert!(again.is_err());
        host.detach_all().await;
        assert!(!host.is_attached("binary_sensor.market"));
    }

    fn margin_account(amount: f64) -> serde_json::Value {
        json!({
            "securitiesAccount": { "type": "MARGIN", "currentBalances": { "availableFunds": amount } }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn open_market_switches_account_to_fast_polling() {
        let provider = Arc::new(FakeProvider::default());
        for amount in 0..10 {
            provider.push_account(Ok(margin_account(amount as f64)));
        }

        let mut host = Host::new(StateStore::new(), "binary_sensor.market");
        host.store()
            .publish("binary_sensor.market", StateValue::On, Attributes::new(), Availability::Available);

        let plan = PollPlan::FollowMarket {
            intervals: CadenceIntervals::default(),
            initial: PollCadence::Slow,
        };
        host.attach(Box::new(AvailableFundsSensor::new(provider.clone(), "000011112222")), plan)
            .unwrap();

        // immediate poll on attach, then every 10 s instead of every 300 s
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(provider.pending_accounts(), 6);

        host.detach_all().await;
    }

    #[tokio::test]
    async fn detached_entity_is_left_unavailable() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_market_hours(Ok(json!({ "equity": { "EQ": { "isOpen": true } } })));

        let mut host = Host::new(StateStore::new(), "binary_sensor.market");
        let mut changes = host.store().subscribe();
        host.attach(
            Box::new(MarketOpenSensor::new(provider, "EQUITY")),
            PollPlan::Fixed(Duration::from_secs(60)),
        )
        .unwrap();

        changes.recv().await.unwrap();
        assert_eq!(host.store().binary_state("binary_sensor.market"), Some(true));

        assert!(host.detach("binary_sensor.market").await);

        let last = host.store().get("binary_sensor.market").unwrap();
        assert_eq!(last.state, StateValue::On);
        assert!(!last.is_available());
        assert_eq!(host.store().binary_state("binary_sensor.market"), None);
    }
}
