use crate::scheduling::{schedule_context::ScheduleContext, types::ScheduleDecision};

pub trait SchedulePolicy {
    fn decide(&mut self, ctx: &ScheduleContext) -> ScheduleDecision;
}
