// Date and timestamp helpers shared by the stores and the CLI

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use anyhow::Result;

/// Current time as UTC milliseconds (the storage representation)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert stored UTC milliseconds back into a timestamp
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Parse a calendar date expression: `2026-01-10`, `today`, `tomorrow`, `yesterday`
pub fn parse_date_expr(expr: &str) -> Result<NaiveDate> {
    let expr = expr.trim();
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(date);
    }

    let today = Local::now().date_naive();
    match expr.to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => anyhow::bail!("Unsupported date expression: '{}'. Use YYYY-MM-DD, today, tomorrow or yesterday.", expr),
    }
}

/// Format a timestamp relative to `now`: "Just now", "5m ago", "3h ago", "2d ago"
pub fn format_time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - ts).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h ago", hours)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        "Just now".to_string()
    }
}

/// Format a timestamp in local time for tables
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_date() {
        let date = parse_date_expr("2026-01-10").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
    }

    #[test]
    fn test_parse_relative_dates() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date_expr("today").unwrap(), today);
        assert_eq!(parse_date_expr("Tomorrow").unwrap(), today + Duration::days(1));
        assert!(parse_date_expr("next tuesday").is_err());
        assert!(parse_date_expr("2026-13-40").is_err());
    }

    #[test]
    fn test_millis_roundtrip() {
        let now = now_millis();
        assert_eq!(from_millis(now).timestamp_millis(), now);
    }

    #[test]
    fn test_format_time_ago() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now, now), "Just now");
        assert_eq!(format_time_ago(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now - Duration::days(2), now), "2d ago");
    }
}
