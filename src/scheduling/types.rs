use std::fmt;
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollCadence {
    Fast,
    Slow,
}

impl fmt::Display for PollCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Slow => write!(f, "slow"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CadenceIntervals {
    pub fast: Duration,
    pub slow: Duration,
}

impl CadenceIntervals {
    pub fn new(fast: Duration, slow: Duration) -> Self {
        Self { fast, slow }
    }

    /// Both cadences share one interval; used by entities that never adapt.
    pub fn fixed(every: Duration) -> Self {
        Self::new(every, every)
    }

    pub fn interval(&self, cadence: PollCadence) -> Duration {
        match cadence {
            PollCadence::Fast => self.fast,
            PollCadence::Slow => self.slow,
        }
    }
}

impl Default for CadenceIntervals {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(10),
            slow: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    Keep(KeepReason),
    Reconfigure(PollCadence),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeepReason {
    AlreadyAtCadence,
    MarketStateUnknown,
    FixedInterval,
}

/// How an attached entity is polled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollPlan {
    Fixed(Duration),
    FollowMarket {
        intervals: CadenceIntervals,
        initial: PollCadence,
    },
}
