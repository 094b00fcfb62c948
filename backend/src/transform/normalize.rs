//! Normalizer: raw table rows to [`CleanRecord`]s.
//!
//! Malformed rows are dropped and counted, never reported as errors. The
//! only failure is a schema without the designated date or value column.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::SchemaError;
use crate::models::CleanRecord;
use crate::parser::RawTable;
use crate::validation::Schema;

/// Date layouts tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%d.%m.%Y"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Last resort: a year-month-day triple anywhere in the text.
static EMBEDDED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").expect("embedded date pattern is valid")
});

/// Outcome of normalizing one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalized {
    pub records: Vec<CleanRecord>,
    /// Rows read from the table.
    pub rows_read: usize,
    /// Rows without a parsable date.
    pub missing_period: usize,
    /// Rows with a date but no numeric value.
    pub missing_value: usize,
}

impl Normalized {
    pub fn dropped(&self) -> usize {
        self.missing_period + self.missing_value
    }
}

/// Remove quote and tab noise around a date field.
pub fn clean_date_text(raw: &str) -> String {
    raw.replace(&['"', '\t'][..], "").trim().to_string()
}

/// Parse a cleaned date field. Unparsable text yields `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").ok())
        .or_else(|| {
            EMBEDDED_DATE.captures(text).and_then(|caps| {
                let year = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                let day = caps[3].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            })
        })
}

/// Calendar year of a raw date field, after noise removal.
pub fn parse_period(raw: &str) -> Option<i32> {
    parse_date(&clean_date_text(raw)).map(|d| d.year())
}

/// Coerce a field to a finite float. Empty or non-numeric text yields `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize the designated date and value columns of `table`.
pub fn normalize_temperature(
    table: &RawTable,
    date_column: &str,
    value_column: &str,
) -> Result<Normalized, SchemaError> {
    let schema = Schema::from_headers(&table.headers);
    let date_idx = schema.require(date_column)?;
    let value_idx = schema.require(value_column)?;

    let mut records = Vec::with_capacity(table.row_count());
    let mut missing_period = 0;
    let mut missing_value = 0;

    for row in 0..table.row_count() {
        let Some(period) = parse_period(table.field(row, date_idx)) else {
            missing_period += 1;
            continue;
        };
        let Some(value) = parse_value(table.field(row, value_idx)) else {
            missing_value += 1;
            continue;
        };
        records.push(CleanRecord { period, value });
    }

    Ok(Normalized {
        records,
        rows_read: table.row_count(),
        missing_period,
        missing_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_bytes;

    fn table(csv: &str) -> RawTable {
        load_bytes(csv.as_bytes(), "test", &["utf-8"]).unwrap()
    }

    #[test]
    fn test_clean_date_text() {
        assert_eq!(clean_date_text("\t\"1907-10-01\" "), "1907-10-01");
        assert_eq!(clean_date_text("  2001-02-03\t"), "2001-02-03");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1999, 12, 31);
        assert_eq!(parse_date("1999-12-31"), expected);
        assert_eq!(parse_date("1999/12/31"), expected);
        assert_eq!(parse_date("1999.12.31"), expected);
        assert_eq!(parse_date("19991231"), expected);
        assert_eq!(parse_date("1999-12-31 06:00:00"), expected);
        assert_eq!(parse_date("1999-12"), NaiveDate::from_ymd_opt(1999, 12, 1));
        assert_eq!(parse_date("observed 1999-12-31 (KST)"), expected);
    }

    #[test]
    fn test_parse_date_failures() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("1999-13-45"), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 13.5 "), Some(13.5));
        assert_eq!(parse_value("-2"), Some(-2.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
    }

    #[test]
    fn test_normalize_drops_incomplete_rows() {
        let t = table(
            " 지점 , 날짜 ,평균기온(℃)\n\
             108,\t1907-10-01,13.5\n\
             108,\"1907-10-02\",\n\
             108,garbage,12.0\n\
             108,1908-01-01,-3.25\n",
        );

        let normalized = normalize_temperature(&t, "날짜", "평균기온(℃)").unwrap();

        assert_eq!(normalized.rows_read, 4);
        assert_eq!(normalized.missing_value, 1);
        assert_eq!(normalized.missing_period, 1);
        assert_eq!(normalized.dropped(), 2);
        assert_eq!(
            normalized.records,
            vec![
                CleanRecord { period: 1907, value: 13.5 },
                CleanRecord { period: 1908, value: -3.25 },
            ]
        );
    }

    #[test]
    fn test_missing_date_column_is_fatal() {
        let t = table("지점,일자,평균기온(℃)\n108,1907-10-01,13.5\n");

        let err = normalize_temperature(&t, "날짜", "평균기온(℃)").unwrap_err();
        assert!(matches!(err, SchemaError::MissingRequiredColumn { ref column, .. } if column == "날짜"));
    }

    #[test]
    fn test_missing_value_column_is_fatal() {
        let t = table("날짜,최저기온(℃)\n1907-10-01,13.5\n");
        assert!(normalize_temperature(&t, "날짜", "평균기온(℃)").is_err());
    }
}
