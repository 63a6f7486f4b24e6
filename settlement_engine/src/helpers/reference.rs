use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;

const VIETNAM_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Generates a numeric, time-based payment reference: the current unix time in milliseconds followed by three random
/// digits.
///
/// The aggregator gateway only accepts numeric order codes, so the same format is used for every gateway.
pub fn new_transaction_reference() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = rand::thread_rng().gen_range(0..1000);
    format!("{millis}{suffix:03}")
}

/// Converts a UTC timestamp to Vietnam local time (UTC+7, no daylight saving).
pub fn vietnam_time(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(VIETNAM_UTC_OFFSET_SECS)
        .map(|offset| ts.with_timezone(&offset))
        .unwrap_or_else(|| ts.fixed_offset())
}
