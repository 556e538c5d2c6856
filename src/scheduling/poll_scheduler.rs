use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::runtime::timer::{TimerHandle, TimerService};
use crate::scheduling::{
    policies::{fixed_interval_policy::FixedIntervalPolicy, market_hours_policy::MarketHoursPolicy},
    schedule_context::ScheduleContext,
    schedule_policy::SchedulePolicy,
    types::{CadenceIntervals, PollCadence, PollPlan, ScheduleDecision},
};

/// Owns an entity's timer registration and swaps it when the policy asks for a new cadence.
pub struct PollScheduler {
    entity_id: String,
    policy: Box<dyn SchedulePolicy + Send>,
    intervals: CadenceIntervals,
    cadence: PollCadence,
    timers: Arc<dyn TimerService>,
    registration: Option<TimerHandle>,
    reconfigurations: u64,
}

impl PollScheduler {
    pub fn new(
        entity_id: impl Into<String>,
        policy: Box<dyn SchedulePolicy + Send>,
        intervals: CadenceIntervals,
        initial: PollCadence,
        timers: Arc<dyn TimerService>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            policy,
            intervals,
            cadence: initial,
            timers,
            registration: None,
            reconfigurations: 0,
        }
    }

    pub fn for_plan(
        entity_id: impl Into<String>,
        plan: PollPlan,
        timers: Arc<dyn TimerService>,
    ) -> Self {
        match plan {
            PollPlan::Fixed(every) => Self::new(
                entity_id,
                Box::new(FixedIntervalPolicy),
                CadenceIntervals::fixed(every),
                PollCadence::Slow,
                timers,
            ),
            PollPlan::FollowMarket { intervals, initial } => {
                Self::new(entity_id, Box::new(MarketHoursPolicy), intervals, initial, timers)
            }
        }
    }

    pub fn cadence(&self) -> PollCadence {
        self.cadence
    }

    pub fn interval(&self) -> Duration {
        self.intervals.interval(self.cadence)
    }

    pub fn reconfigurations(&self) -> u64 {
        self.reconfigurations
    }

    /// Whether `timer_id` belongs to the registration currently in force.
    pub fn is_current(&self, timer_id: u64) -> bool {
        self.registration
            .as_ref()
            .is_some_and(|registration| registration.id() == timer_id)
    }

    pub fn attach(&mut self) {
        if self.registration.is_some() {
            return;
        }

        let registration = self.timers.register(self.interval());
        debug!(
            entity_id = %self.entity_id,
            timer_id = registration.id(),
            cadence = %self.cadence,
            every = ?registration.every(),
            "timer registered"
        );
        self.registration = Some(registration);
    }

    pub fn on_tick(&mut self, ctx: &ScheduleContext) -> ScheduleDecision {
        let decision = self.policy.decide(ctx);

        if let ScheduleDecision::Reconfigure(cadence) = decision {
            self.reconfigure(cadence);
        }

        decision
    }

    pub fn detach(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.cancel();
            debug!(entity_id = %self.entity_id, timer_id = registration.id(), "timer released");
        }
    }

    fn reconfigure(&mut self, cadence: PollCadence) {
        if cadence == self.cadence {
            return;
        }

        let previous = self.cadence;
        self.cadence = cadence;
        self.reconfigurations += 1;

        /* NOTE: before attach there is nothing to swap, the new cadence applies on attach */
        let Some(stale) = self.registration.take() else {
            return;
        };
        stale.cancel();

        let registration = self.timers.register(self.interval());
        info!(
            entity_id = %self.entity_id,
            from = %previous,
            to = %cadence,
            every = ?registration.every(),
            "poll cadence changed"
        );

        self.registration = Some(registration);
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.detach();
    }
}
