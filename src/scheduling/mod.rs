pub mod policies;
pub mod poll_scheduler;
pub mod schedule_context;
pub mod schedule_policy;
pub mod types;
