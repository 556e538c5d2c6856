use crate::scheduling::{
    schedule_context::ScheduleContext,
    schedule_policy::SchedulePolicy,
    types::{KeepReason, ScheduleDecision},
};

pub struct FixedIntervalPolicy;

impl SchedulePolicy for FixedIntervalPolicy {
    fn decide(&mut self, _ctx: &ScheduleContext) -> ScheduleDecision {
        ScheduleDecision::Keep(KeepReason::FixedInterval)
    }
}
