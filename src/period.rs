use crate::cell::{Row, row_number};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref YEAR_MONTH_REGEX: Regex = Regex::new(r"^(\d{4})(?:-(\d{2}))?$").unwrap();
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// Date-times carrying a numeric offset without the RFC 3339 colon (+0000)
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Suffix appended to week keys
pub const WEEK_SUFFIX: &str = " week";

/// Calendar granularity for time bucketing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub period: String,
    pub value: f64,
}

/// Wire shape of an aggregate result: `{"data": [...]}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub data: Vec<PeriodBucket>,
}

/// Interpret a cell's text as a calendar date (UTC)
///
/// Returns `None` for anything that does not look like a date. Values with
/// a UTC offset are shifted to UTC before the date is taken.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use data_vision::period::parse_date;
///
/// let jan5 = NaiveDate::from_ymd_opt(2024, 1, 5);
/// assert_eq!(parse_date("2024-01-05"), jan5);
/// assert_eq!(parse_date("2024/01/05 10:30:00"), jan5);
/// assert_eq!(parse_date("01/05/2024"), jan5);
/// assert_eq!(parse_date("2024-01-04T23:00:00-02:00"), jan5);
/// assert_eq!(parse_date("Jan 5, 2024"), jan5);
/// assert_eq!(parse_date("bad"), None);
/// ```
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    // Bare year or year-month
    let caps = YEAR_MONTH_REGEX.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps.get(2).map_or(Some(1), |m| m.as_str().parse().ok())?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Bucket key for a date at the given granularity
///
/// Keys of one granularity sort chronologically as plain strings.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use data_vision::period::{period_key, Period};
///
/// // 2024-01-10 is a Wednesday; its week starts on Sunday the 7th
/// let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// assert_eq!(period_key(date, Period::Day).unwrap(), "2024-01-10");
/// assert_eq!(period_key(date, Period::Week).unwrap(), "2024-01-07 week");
/// assert_eq!(period_key(date, Period::Month).unwrap(), "2024-01");
/// assert_eq!(period_key(date, Period::Year).unwrap(), "2024");
/// ```
pub fn period_key(date: NaiveDate, period: Period) -> Option<String> {
    let key = match period {
        Period::Day => date.format("%Y-%m-%d").to_string(),
        Period::Week => {
            let offset = date.weekday().num_days_from_sunday();
            let week_start = date.checked_sub_days(Days::new(offset as u64))?;
            format!("{}{}", week_start.format("%Y-%m-%d"), WEEK_SUFFIX)
        }
        Period::Month => date.format("%Y-%m").to_string(),
        Period::Year => date.format("%Y").to_string(),
    };
    Some(key)
}

/// Sum a value column per calendar period
///
/// Rows whose date cell is missing, empty, zero, or not a recognizable date
/// are skipped. Values are coerced like everywhere else (non-numeric counts
/// as zero). The result has one bucket per distinct key, ordered by plain
/// string comparison of the key.
///
/// # Arguments
/// * `rows` - Rows to aggregate
/// * `date_column` - Column holding the dates
/// * `value_column` - Column holding the values to sum
/// * `period` - Bucket granularity
///
/// # Examples
/// ```
/// use data_vision::cell::{CellValue, Row};
/// use data_vision::period::{aggregate_by_period, Period};
///
/// let rows: Vec<Row> = [("2024-01-05", 10.0), ("2024-01-07", 5.0), ("2024-02-01", 3.0)]
///     .iter()
///     .map(|(d, v)| {
///         let mut row = Row::new();
///         row.insert("d".to_string(), CellValue::from(*d));
///         row.insert("v".to_string(), CellValue::Number(*v));
///         row
///     })
///     .collect();
///
/// let buckets = aggregate_by_period(&rows, "d", "v", Period::Month);
/// assert_eq!(buckets.len(), 2);
/// assert_eq!((buckets[0].period.as_str(), buckets[0].value), ("2024-01", 15.0));
/// assert_eq!((buckets[1].period.as_str(), buckets[1].value), ("2024-02", 3.0));
/// ```
pub fn aggregate_by_period(
    rows: &[Row],
    date_column: &str,
    value_column: &str,
    period: Period,
) -> Vec<PeriodBucket> {
    // BTreeMap keeps keys in byte-wise string order
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();

    for row in rows {
        let Some(cell) = row.get(date_column) else {
            continue;
        };
        if cell.is_falsy() {
            continue;
        }
        let Some(key) = parse_date(&cell.to_key()).and_then(|date| period_key(date, period))
        else {
            continue;
        };
        *buckets.entry(key).or_insert(0.0) += row_number(row, value_column);
    }

    buckets
        .into_iter()
        .map(|(period, value)| PeriodBucket { period, value })
        .collect()
}
