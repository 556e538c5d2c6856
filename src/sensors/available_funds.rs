use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::provider::BrokerageProvider;
use crate::runtime::entity::{Attributes, Availability, AvailabilityTracker, Sensor, StateValue};
use crate::types::account::AccountSnapshot;

/// Spendable cash of one account, in dollars.
pub struct AvailableFundsSensor {
    provider: Arc<dyn BrokerageProvider>,
    account_id: String,
    entity_id: String,
    snapshot: Option<AccountSnapshot>,
    availability: AvailabilityTracker,
}

impl AvailableFundsSensor {
    pub fn new(provider: Arc<dyn BrokerageProvider>, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        let entity_id = format!("sensor.available_funds_{}", account_suffix(&account_id));

        Self {
            provider,
            account_id,
            entity_id,
            snapshot: None,
            availability: AvailabilityTracker::default(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        "Dollars"
    }

    pub fn icon(&self) -> &'static str {
        "mdi:cash"
    }
}

#[async_trait]
impl Sensor for AvailableFundsSensor {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn name(&self) -> String {
        format!("Available Funds #{}", account_suffix(&self.account_id))
    }

    fn state(&self) -> StateValue {
        self.snapshot
            .as_ref()
            .map_or(StateValue::Unknown, |snapshot| snapshot.available_funds.into())
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = match self.snapshot.as_ref().map(|snapshot| &snapshot.raw) {
            Some(Value::Object(raw)) => raw.clone(),
            _ => Attributes::new(),
        };
        attributes.insert("unit_of_measurement".into(), json!(self.unit_of_measurement()));
        attributes.insert("icon".into(), json!(self.icon()));
        attributes
    }

    fn availability(&self) -> Availability {
        self.availability.current()
    }

    async fn refresh(&mut self, _now: DateTime<Utc>) {
        debug!(entity_id = %self.entity_id, "updating sensor");

        let result = self
            .provider
            .get_account(&self.account_id)
            .await
            .and_then(|payload| AccountSnapshot::from_payload(&self.account_id, &payload));

        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.availability.on_success(&self.entity_id);
            }
            Err(error) => self.availability.on_failure(&self.entity_id, &error),
        }
    }
}

fn account_suffix(account_id: &str) -> &str {
    let start = account_id
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(index, _)| index);

    &account_id[start..]
}
