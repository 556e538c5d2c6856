//! Test doubles for the provider and timer seams.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::provider::{BrokerageProvider, ProviderError, ProviderResult};
use crate::runtime::timer::{TimerHandle, TimerService};
use crate::types::order::{OrderPlacement, OrderRequest};

/// Replays scripted responses in order; an exhausted script behaves like a dropped connection.
#[derive(Default)]
pub struct FakeProvider {
    market_hours: Mutex<VecDeque<ProviderResult<Value>>>,
    accounts: Mutex<VecDeque<ProviderResult<Value>>>,
    quotes: Mutex<VecDeque<ProviderResult<Value>>>,
    orders: Mutex<Vec<(String, OrderRequest)>>,
}

impl FakeProvider {
    pub fn push_market_hours(&self, response: ProviderResult<Value>) {
        self.market_hours.lock().push_back(response);
    }

    pub fn push_account(&self, response: ProviderResult<Value>) {
        self.accounts.lock().push_back(response);
    }

    pub fn push_quote(&self, response: ProviderResult<Value>) {
        self.quotes.lock().push_back(response);
    }

    pub fn pending_accounts(&self) -> usize {
        self.accounts.lock().len()
    }

    pub fn placed_orders(&self) -> Vec<(String, OrderRequest)> {
        self.orders.lock().clone()
    }
}

fn next(script: &Mutex<VecDeque<ProviderResult<Value>>>) -> ProviderResult<Value> {
    script
        .lock()
        .pop_front()
        .unwrap_or_else(|| Err(ProviderError::Disconnected("no scripted response".into())))
}

#[async_trait]
impl BrokerageProvider for FakeProvider {
    async fn get_market_hours(&self, _asset_class: &str) -> ProviderResult<Value> {
        next(&self.market_hours)
    }

    async fn get_account(&self, _account_id: &str) -> ProviderResult<Value> {
        next(&self.accounts)
    }

    async fn get_quote(&self, _symbol: &str) -> ProviderResult<Value> {
        next(&self.quotes)
    }

    async fn place_order(
        &self,
        account_id: &str,
        order: &OrderRequest,
    ) -> ProviderResult<OrderPlacement> {
        self.orders
            .lock()
            .push((account_id.to_string(), order.clone()));

        Ok(OrderPlacement {
            order_id: Some("1001".into()),
        })
    }
}

/// Records registrations instead of spawning timers.
#[derive(Default)]
pub struct RecordingTimers {
    handles: Mutex<Vec<(u64, Duration, CancellationToken)>>,
}

impl RecordingTimers {
    pub fn registered(&self) -> Vec<Duration> {
        self.handles.lock().iter().map(|(_, every, _)| *every).collect()
    }

    pub fn last_id(&self) -> u64 {
        self.handles.lock().last().map_or(0, |(id, _, _)| *id)
    }

    pub fn cancelled_count(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|(_, _, token)| token.is_cancelled())
            .count()
    }

    pub fn live_count(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|(_, _, token)| !token.is_cancelled())
            .count()
    }
}

impl TimerService for RecordingTimers {
    fn register(&self, every: Duration) -> TimerHandle {
        let mut handles = self.handles.lock();
        let id = handles.len() as u64 + 1;
        let token = CancellationToken::new();
        handles.push((id, every, token.clone()));

        TimerHandle::new(id, every, token)
    }
}
