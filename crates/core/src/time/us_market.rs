use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::HashSet;

// Fixed EST offset; a DST-shifted hour near midnight only matters for the closed-day warning.
const ET_OFFSET_SECS: i32 = -5 * 3600;

pub fn exchange_date(now_utc: DateTime<Utc>) -> NaiveDate {
    (now_utc + Duration::seconds(ET_OFFSET_SECS as i64)).date_naive()
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !is_weekend(date) && !configured_holidays(date.year()).contains(&date)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn configured_holidays(year: i32) -> HashSet<NaiveDate> {
    // Fixed and Monday holidays only; extend via MARKET_HOLIDAYS="YYYY-MM-DD,YYYY-MM-DD".
    let mut out = HashSet::new();
    for (m, d) in [(1, 1), (7, 4), (12, 25)] {
        if let Some(date) = NaiveDate::from_ymd_opt(year, m, d) {
            out.insert(date);
        }
    }
    // MLK Day and Presidents Day: third Monday of January / February.
    for m in [1, 2] {
        if let Some(date) = NaiveDate::from_weekday_of_month_opt(year, m, Weekday::Mon, 3) {
            out.insert(date);
        }
    }

    if let Ok(raw) = std::env::var("MARKET_HOLIDAYS") {
        out.extend(parse_holiday_list(&raw));
    }

    out
}

/// Parses `YYYY-MM-DD,YYYY-MM-DD`; blank or malformed entries are skipped.
pub fn parse_holiday_list(raw: &str) -> Vec<NaiveDate> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| NaiveDate::parse_from_str(part, "%Y-%m-%d").ok())
        .collect()
}
