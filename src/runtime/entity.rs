use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::provider::{ErrorKind, ProviderError};

pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    On,
    Off,
    Number(f64),
    Text(String),
    Unknown,
}

impl StateValue {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::On,
            Some(false) => Self::Off,
            None => Self::Unknown,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            _ => None,
        }
    }
}

impl From<Option<f64>> for StateValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unknown, Self::Number)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Number(value) => write!(f, "{value:.2}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Availability {
    #[default]
    Unavailable,
    Available,
}

/// What the runtime needs from a polled entity.
#[async_trait]
pub trait Sensor: Send {
    fn entity_id(&self) -> &str;

    fn name(&self) -> String;

    fn state(&self) -> StateValue;

    fn attributes(&self) -> Attributes;

    fn availability(&self) -> Availability;

    /// Performs one provider read. Failures are absorbed into the entity's availability.
    async fn refresh(&mut self, now: DateTime<Utc>);
}

/// `Unavailable -> Available -> Unavailable` bookkeeping shared by the sensors.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    current: Availability,
}

impl AvailabilityTracker {
    pub fn current(&self) -> Availability {
        self.current
    }

    pub fn on_success(&mut self, entity_id: &str) {
        if self.current == Availability::Unavailable {
            info!(%entity_id, "entity available");
        }
        self.current = Availability::Available;
    }

    pub fn on_failure(&mut self, entity_id: &str, error: &ProviderError) {
        let was_available = self.current == Availability::Available;
        self.current = Availability::Unavailable;

        match error.kind() {
            ErrorKind::Configuration => {
                error!(%entity_id, error = %error, "provider rejected credentials or account");
            }
            ErrorKind::Transport if was_available => {
                warn!(%entity_id, error = %error, "entity unavailable");
            }
            ErrorKind::Transport => {
                debug!(%entity_id, error = %error, "entity still unavailable");
            }
            ErrorKind::MalformedPayload => {
                warn!(%entity_id, error = %error, "unreadable provider payload");
            }
        }
    }
}
