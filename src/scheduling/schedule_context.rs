use crate::scheduling::types::PollCadence;

pub struct ScheduleContext {
    /// Regular-session state as last published by the market entity, `None` when unknown.
    pub market_open: Option<bool>,

    pub current: PollCadence,
}
