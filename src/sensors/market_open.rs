use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::market::{hours_parser::parse_market_hours, session_classifier::classify_all};
use crate::provider::BrokerageProvider;
use crate::runtime::entity::{Attributes, Availability, AvailabilityTracker, Sensor, StateValue};
use crate::types::market_hours::{SessionName, SessionStatus};

pub const MARKET_ENTITY_ID: &str = "binary_sensor.market";

/// Regular-session open/closed, with pre/post-market flags as attributes.
pub struct MarketOpenSensor {
    provider: Arc<dyn BrokerageProvider>,
    asset_class: String,
    regular: SessionStatus,
    pre: SessionStatus,
    post: SessionStatus,
    availability: AvailabilityTracker,
}

impl MarketOpenSensor {
    pub fn new(provider: Arc<dyn BrokerageProvider>, asset_class: impl Into<String>) -> Self {
        Self {
            provider,
            asset_class: asset_class.into(),
            regular: SessionStatus::Unknown,
            pre: SessionStatus::Unknown,
            post: SessionStatus::Unknown,
            availability: AvailabilityTracker::default(),
        }
    }

    pub fn device_class(&self) -> &'static str {
        "Market"
    }

    fn apply(&mut self, payload: &Value, now: DateTime<Utc>) {
        let snapshot = parse_market_hours(payload, &self.asset_class);
        let statuses = classify_all(&snapshot, now);

        self.regular = match (statuses.regular, snapshot.is_open) {
            (SessionStatus::Unknown, Some(is_open)) => {
                debug!("regular session hours missing, using isOpen flag");
                is_open.into()
            }
            (status, _) => status,
        };
        self.pre = statuses.get(SessionName::Pre);
        self.post = statuses.get(SessionName::Post);
    }
}

#[async_trait]
impl Sensor for MarketOpenSensor {
    fn entity_id(&self) -> &str {
        MARKET_ENTITY_ID
    }

    fn name(&self) -> String {
        "Market".to_string()
    }

    fn state(&self) -> StateValue {
        StateValue::from_flag(self.regular.as_bool())
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("preMarket".into(), json!(self.pre.as_bool()));
        attributes.insert("postMarket".into(), json!(self.post.as_bool()));
        attributes.insert("device_class".into(), json!(self.device_class()));
        attributes
    }

    fn availability(&self) -> Availability {
        self.availability.current()
    }

    async fn refresh(&mut self, now: DateTime<Utc>) {
        match self.provider.get_market_hours(&self.asset_class).await {
            Ok(payload) => {
                self.apply(&payload, now);
                self.availability.on_success(MARKET_ENTITY_ID);
            }
            Err(error) => self.availability.on_failure(MARKET_ENTITY_ID, &error),
        }
    }
}
