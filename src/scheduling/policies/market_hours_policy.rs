use crate::scheduling::{
    schedule_context::ScheduleContext,
    schedule_policy::SchedulePolicy,
    types::{KeepReason, PollCadence, ScheduleDecision},
};

/// Fast polling while the regular session is open, slow otherwise.
///
/// Level-triggered: a decision is only emitted when the observed market state
/// disagrees with the cadence already in force.
pub struct MarketHoursPolicy;

impl SchedulePolicy for MarketHoursPolicy {
    fn decide(&mut self, ctx: &ScheduleContext) -> ScheduleDecision {
        let wanted = match ctx.market_open {
            Some(true) => PollCadence::Fast,
            Some(false) => PollCadence::Slow,
            None => return ScheduleDecision::Keep(KeepReason::MarketStateUnknown),
        };

        if wanted == ctx.current {
            ScheduleDecision::Keep(KeepReason::AlreadyAtCadence)
        } else {
            ScheduleDecision::Reconfigure(wanted)
        }
    }
}
