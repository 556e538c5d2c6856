use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SessionName {
    Pre,
    Regular,
    Post,
}

impl SessionName {
    pub const ALL: [SessionName; 3] = [SessionName::Pre, SessionName::Regular, SessionName::Post];

    /// Key used for the session inside the provider's `sessionHours` object.
    pub fn wire_key(self) -> &'static str {
        match self {
            SessionName::Pre => "preMarket",
            SessionName::Regular => "regularMarket",
            SessionName::Post => "postMarket",
        }
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionName::Pre => write!(f, "pre"),
            SessionName::Regular => write!(f, "regular"),
            SessionName::Post => write!(f, "post"),
        }
    }
}

/// Half-open trading window `[start, end)`, always held as absolute UTC instants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SessionWindow {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start > end {
            return None;
        }

        Some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketHoursSnapshot {
    pre: Option<SessionWindow>,
    regular: Option<SessionWindow>,
    post: Option<SessionWindow>,

    /// Legacy `isOpen` flag, reported by the provider alongside (or instead of) session hours.
    pub is_open: Option<bool>,

    pub date: Option<NaiveDate>,
}

impl MarketHoursSnapshot {
    /// Snapshot with no session windows yet; add them with [`MarketHoursSnapshot::with_window`].
    pub fn new(is_open: Option<bool>, date: Option<NaiveDate>) -> Self {
        Self {
            is_open,
            date,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, session: SessionName, window: SessionWindow) -> Self {
        *self.slot_mut(session) = Some(window);
        self
    }

    pub fn window(&self, session: SessionName) -> Option<&SessionWindow> {
        match session {
            SessionName::Pre => self.pre.as_ref(),
            SessionName::Regular => self.regular.as_ref(),
            SessionName::Post => self.post.as_ref(),
        }
    }

    fn slot_mut(&mut self, session: SessionName) -> &mut Option<SessionWindow> {
        match session {
            SessionName::Pre => &mut self.pre,
            SessionName::Regular => &mut self.regular,
            SessionName::Post => &mut self.post,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Closed,
    Unknown,
}

impl SessionStatus {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            SessionStatus::Open => Some(true),
            SessionStatus::Closed => Some(false),
            SessionStatus::Unknown => None,
        }
    }
}

impl From<bool> for SessionStatus {
    fn from(open: bool) -> Self {
        if open {
            SessionStatus::Open
        } else {
            SessionStatus::Closed
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionStatuses {
    pub pre: SessionStatus,
    pub regular: SessionStatus,
    pub post: SessionStatus,
}

impl SessionStatuses {
    pub fn get(&self, session: SessionName) -> SessionStatus {
        match session {
            SessionName::Pre => self.pre,
            SessionName::Regular => self.regular,
            SessionName::Post => self.post,
        }
    }
}
