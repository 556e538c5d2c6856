use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::runtime::entity::{Attributes, Availability, StateValue};

#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub entity_id: String,
    pub state: StateValue,
    pub attributes: Attributes,
    pub availability: Availability,
    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    fn same_content(&self, state: &StateValue, attributes: &Attributes, availability: Availability) -> bool {
        self.state == *state && self.attributes == *attributes && self.availability == availability
    }
}

#[derive(Debug, Clone)]
pub struct StateChange {
    pub entity_id: String,
    pub old: Option<EntityState>,
    pub new: EntityState,
}

/// Published entity states, readable by every entity of the entry.
///
/// Each key has a single writer (the entity it names); readers may see a value
/// up to one poll interval old.
#[derive(Debug, Clone)]
pub struct StateStore {
    states: Arc<RwLock<HashMap<String, EntityState>>>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(1_024);

        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Stores the entity's state. Returns whether anything other than `last_updated` moved.
    pub fn publish(
        &self,
        entity_id: &str,
        state: StateValue,
        attributes: Attributes,
        availability: Availability,
    ) -> bool {
        let now = Utc::now();

        let (old, new, changed) = {
            let mut states = self.states.write();
            let old = states.get(entity_id).cloned();

            let changed = !old
                .as_ref()
                .is_some_and(|old| old.same_content(&state, &attributes, availability));

            let last_changed = match &old {
                Some(old) if !changed => old.last_changed,
                _ => now,
            };

            let new = EntityState {
                entity_id: entity_id.to_string(),
                state,
                attributes,
                availability,
                last_changed,
                last_updated: now,
            };
            states.insert(entity_id.to_string(), new.clone());

            (old, new, changed)
        };

        if changed {
            let _ = self.changes.send(StateChange {
                entity_id: entity_id.to_string(),
                old,
                new,
            });
        }

        changed
    }

    /// Flags a published entity as unavailable, keeping its last state and attributes.
    pub fn mark_unavailable(&self, entity_id: &str) -> bool {
        let Some(last) = self.get(entity_id) else {
            return false;
        };

        self.publish(entity_id, last.state, last.attributes, Availability::Unavailable)
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.read().get(entity_id).cloned()
    }

    /// On/off value of an available entity; `None` when absent, unavailable or unknown.
    pub fn binary_state(&self, entity_id: &str) -> Option<bool> {
        let states = self.states.read();
        let entity = states.get(entity_id)?;

        if !entity.is_available() {
            return None;
        }

        entity.state.as_bool()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(pre: Option<bool>) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("preMarket".into(), json!(pre));
        attributes
    }

    #[test]
    fn identical_publish_is_not_a_change() {
        let store = StateStore::new();
        let mut changes = store.subscribe();

        assert!(store.publish("binary_sensor.market", StateValue::On, attributes(Some(false)), Availability::Available));
        let first = store.get("binary_sensor.market").unwrap();

        assert!(!store.publish("binary_sensor.market", StateValue::On, attributes(Some(false)), Availability::Available));
        let second = store.get("binary_sensor.market").unwrap();

        assert_eq!(first.last_changed, second.last_changed);
        assert!(second.last_updated >= first.last_updated);

        assert!(changes.try_recv().is_ok());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn availability_flip_is_a_change() {
        let store = StateStore::new();

        store.publish("sensor.funds", StateValue::Number(10.0), Attributes::new(), Availability::Available);
        let changed = store.publish("sensor.funds", StateValue::Number(10.0), Attributes::new(), Availability::Unavailable);

        assert!(changed);
        assert!(!store.get("sensor.funds").unwrap().is_available());
    }

    #[test]
    fn binary_state_hides_unknown_and_unavailable() {
        let store = StateStore::new();
        assert_eq!(store.binary_state("binary_sensor.market"), None);

        store.publish("binary_sensor.market", StateValue::Off, Attributes::new(), Availability::Available);
        assert_eq!(store.binary_state("binary_sensor.market"), Some(false));

        store.publish("binary_sensor.market", StateValue::On, Attributes::new(), Availability::Unavailable);
        assert_eq!(store.binary_state("binary_sensor.market"), None);

        store.publish("binary_sensor.market", StateValue::Unknown, Attributes::new(), Availability::Available);
        assert_eq!(store.binary_state("binary_sensor.market"), None);
    }

    #[test]
    fn mark_unavailable_keeps_last_values() {
        let store = StateStore::new();
        assert!(!store.mark_unavailable("binary_sensor.market"));

        store.publish("binary_sensor.market", StateValue::On, attributes(Some(true)), Availability::Available);
        assert!(store.mark_unavailable("binary_sensor.market"));

        let last = store.get("binary_sensor.market").unwrap();
        assert_eq!(last.state, StateValue::On);
        assert_eq!(last.attributes, attributes(Some(true)));
        assert!(!last.is_available());
        assert_eq!(store.binary_state("binary_sensor.market"), None);
    }
}
