use chrono::{DateTime, Utc};

use crate::types::market_hours::{MarketHoursSnapshot, SessionName, SessionStatus, SessionStatuses};

/// Whether `session` is trading at `now`. No window means `Unknown`, never `Closed`.
pub fn classify(
    session: SessionName,
    snapshot: &MarketHoursSnapshot,
    now: DateTime<Utc>,
) -> SessionStatus {
    match snapshot.window(session) {
        Some(window) => window.contains(now).into(),
        None => SessionStatus::Unknown,
    }
}

pub fn classify_all(snapshot: &MarketHoursSnapshot, now: DateTime<Utc>) -> SessionStatuses {
    SessionStatuses {
        pre: classify(SessionName::Pre, snapshot, now),
        regular: classify(SessionName::Regular, snapshot, now),
        post: classify(SessionName::Post, snapshot, now),
    }
}
