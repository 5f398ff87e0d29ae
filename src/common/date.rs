// src/common/date.rs

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A calendar day, without time or zone.
///
/// Accepts `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS[.fff]` and RFC 3339
/// timestamps on the way in; always written back as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today in UTC.
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(ts.date_naive()));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Self(ts.date()));
        }
        // "2025-01-15 10:30:00" and similar: fall back to the date prefix
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .map(Self)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn same_month(&self, other: &CalendarDate) -> bool {
        self.year() == other.year() && self.month() == other.month()
    }

    /// Days from `self` to `other`, counting both ends.
    pub fn days_inclusive(&self, other: &CalendarDate) -> i64 {
        (other.0 - self.0).num_days() + 1
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CalendarDate::parse_lenient(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
    }
}

/// `deserialize_with` for optional dates on ingested records: anything that
/// is not a readable date becomes `None` instead of failing the whole record.
pub fn deserialize_lenient_opt<'de, D>(deserializer: D) -> Result<Option<CalendarDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => CalendarDate::parse_lenient(&raw),
        _ => None,
    })
}

/// Inclusive report window. The whole `to` day is part of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: CalendarDate,
    pub to: CalendarDate,
}

impl DateRange {
    pub fn new(from: CalendarDate, to: CalendarDate) -> Self {
        Self { from, to }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    pub fn contains(&self, date: &CalendarDate) -> bool {
        *date >= self.from && *date <= self.to
    }

    pub fn contains_opt(&self, date: Option<&CalendarDate>) -> bool {
        date.is_some_and(|d| self.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> CalendarDate {
        CalendarDate::parse_lenient(raw).unwrap()
    }

    #[test]
    fn parses_common_shapes() {
        assert_eq!(d("2025-01-15"), CalendarDate::from_ymd(2025, 1, 15).unwrap());
        assert_eq!(d("2025-01-15T23:10:00Z"), CalendarDate::from_ymd(2025, 1, 15).unwrap());
        assert_eq!(d("2025-01-15T08:00:00.123"), CalendarDate::from_ymd(2025, 1, 15).unwrap());
        assert_eq!(d("2025-01-15 08:00:00"), CalendarDate::from_ymd(2025, 1, 15).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(CalendarDate::parse_lenient("").is_none());
        assert!(CalendarDate::parse_lenient("next tuesday").is_none());
        assert!(CalendarDate::parse_lenient("2025-13-40").is_none());
    }

    #[test]
    fn optional_dates_degrade_to_none() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "deserialize_lenient_opt")]
            date: Option<CalendarDate>,
        }

        let rows: Vec<Row> =
            serde_json::from_str(r#"[{"date":"2025-02-01"},{"date":"soon"},{"date":null},{}]"#)
                .unwrap();
        let dates: Vec<Option<String>> =
            rows.iter().map(|r| r.date.map(|d| d.to_string())).collect();
        assert_eq!(dates, vec![Some("2025-02-01".to_string()), None, None, None]);
    }

    #[test]
    fn range_includes_both_ends() {
        let range = DateRange::new(d("2025-01-01"), d("2025-01-31"));
        assert!(range.contains(&d("2025-01-01")));
        assert!(range.contains(&d("2025-01-31T23:59:59Z")));
        assert!(!range.contains(&d("2025-02-01")));
        assert!(!range.contains_opt(None));
    }
}
