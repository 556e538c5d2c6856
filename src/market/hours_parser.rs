use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use serde_json::Value;
use tracing::debug;

use crate::types::market_hours::{MarketHoursSnapshot, SessionName, SessionWindow};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Builds a snapshot out of a raw market-hours payload.
///
/// Payload shape: `{ <asset class>: { <product>: { isOpen, date, sessionHours: {
/// preMarket: [{start, end}], regularMarket: [...], postMarket: [...] } } } }`.
/// Anything missing or unreadable leaves only the affected field empty.
pub fn parse_market_hours(payload: &Value, asset_class: &str) -> MarketHoursSnapshot {
    let Some(product) = select_product(payload, asset_class) else {
        debug!(asset_class, "market hours payload has no product for asset class");
        return MarketHoursSnapshot::default();
    };

    let mut snapshot = MarketHoursSnapshot::new(
        product.get("isOpen").and_then(Value::as_bool),
        product
            .get("date")
            .and_then(Value::as_str)
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()),
    );

    for session in SessionName::ALL {
        match session_window(product, session) {
            Some(window) => snapshot = snapshot.with_window(session, window),
            None => debug!(%session, "no usable window for session"),
        }
    }

    snapshot
}

fn select_product<'a>(payload: &'a Value, asset_class: &str) -> Option<&'a Value> {
    let products = payload.get(asset_class.to_lowercase())?.as_object()?;

    /* NOTE: closed-day payloads key the product by the asset class name instead of its code */
    product_code(asset_class)
        .and_then(|code| products.get(code))
        .or_else(|| products.values().next())
        .filter(|product| product.is_object())
}

fn product_code(asset_class: &str) -> Option<&'static str> {
    match asset_class.to_uppercase().as_str() {
        "EQUITY" => Some("EQ"),
        "OPTION" => Some("EQO"),
        "BOND" => Some("BON"),
        _ => None,
    }
}

fn session_window(product: &Value, session: SessionName) -> Option<SessionWindow> {
    let entry = product
        .get("sessionHours")?
        .get(session.wire_key())?
        .as_array()?
        .first()?;

    let start = parse_instant(entry.get("start")?.as_str()?)?;
    let end = parse_instant(entry.get("end")?.as_str()?)?;

    SessionWindow::new(start, end)
}

/// Coerces a provider timestamp into an absolute instant.
///
/// Offset-carrying timestamps keep their offset; naive ones are exchange-local.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(zoned.with_timezone(&Utc));
    }

    if let Ok(zoned) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(zoned.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())?;

    New_York
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
