//! Field level checks shared by create, update and filter payloads. Every
//! failure names the offending field.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::api::response_errors::StoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| StoreError::invalid(field, format!("{value:?} is not a YYYY-MM-DD date")))
}

/// Accepts `HH:MM:SS` or `HH:MM`. The result has no sub-second part so it is
/// stored as `HH:MM:SS`
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, StoreError> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value.trim(), format).ok())
        .and_then(|time| time.with_nanosecond(0))
        .ok_or_else(|| {
            StoreError::invalid(field, format!("{value:?} is not a HH:MM:SS or HH:MM time"))
        })
}

pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime, StoreError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| {
            StoreError::invalid(field, format!("{value:?} is not a YYYY-MM-DD HH:MM:SS timestamp"))
        })
}

/// Base-10 integer from a query string value
pub fn parse_integer(field: &str, value: &str) -> Result<i64, StoreError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::invalid(field, format!("{value:?} is not an integer")))
}

pub fn day_of_week(field: &str, value: i64) -> Result<i64, StoreError> {
    if (0..=6).contains(&value) {
        Ok(value)
    } else {
        Err(StoreError::invalid(field, format!("{value} is not between 0 and 6")))
    }
}

pub fn non_negative(field: &str, value: i64) -> Result<i64, StoreError> {
    if value >= 0 {
        Ok(value)
    } else {
        Err(StoreError::invalid(field, format!("{value} is negative")))
    }
}

pub fn positive(field: &str, value: i64) -> Result<i64, StoreError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(StoreError::invalid(field, format!("{value} must be greater than 0")))
    }
}

pub fn non_blank(field: &str, value: String) -> Result<String, StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::invalid(field, "must not be blank"))
    } else {
        Ok(value)
    }
}

/// Builds the error for a create payload, listing every absent field in the
/// order given
pub fn missing_fields<const N: usize>(fields: [(&str, bool); N]) -> StoreError {
    StoreError::MissingFields {
        fields: fields
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| name.to_owned())
            .collect(),
    }
}

/// Query string values that are present but empty count as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_time_normalizes_short_form() {
        let time = parse_time("scheduled_time", "07:05").unwrap();
        assert_eq!(time.format("%H:%M:%S").to_string(), "07:05:00");

        let time = parse_time("scheduled_time", "18:30:15").unwrap();
        assert_eq!(time.format("%H:%M:%S").to_string(), "18:30:15");
    }

    #[test]
    fn test_time_rejects_garbage() {
        let err = parse_time("scheduled_time", "half past eight").unwrap_err();
        match err {
            StoreError::InvalidField { field, .. } => assert_eq!(field, "scheduled_time"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse_time("scheduled_time", "25:00").is_err());
    }

    #[test]
    fn test_date() {
        assert_eq!(
            parse_date("start_date", "2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("start_date", "01/03/2024").is_err());
        assert!(parse_date("start_date", "2024-02-30").is_err());
    }

    #[test]
    fn test_timestamp_accepts_both_separators() {
        let a = parse_timestamp("completed_at", "2024-03-01 08:00:00").unwrap();
        let b = parse_timestamp("completed_at", "2024-03-01T08:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_integer() {
        assert_eq!(parse_integer("cycle_id", " 42 ").unwrap(), 42);
        assert!(parse_integer("cycle_id", "4.2").is_err());
        assert!(parse_integer("cycle_id", "forty").is_err());
    }

    #[test]
    fn test_day_of_week_range() {
        assert_eq!(day_of_week("day_of_week", 0).unwrap(), 0);
        assert_eq!(day_of_week("day_of_week", 6).unwrap(), 6);
        assert!(day_of_week("day_of_week", 7).is_err());
        assert!(day_of_week("day_of_week", -1).is_err());
    }

    #[test]
    fn test_value_checks() {
        assert_eq!(non_negative("rest_sec", 0).unwrap(), 0);
        assert!(non_negative("rest_sec", -1).is_err());
        assert_eq!(positive("sets", 1).unwrap(), 1);
        assert_eq!(
            positive("sets", 0).unwrap_err(),
            StoreError::invalid("sets", "0 must be greater than 0")
        );
        assert_eq!(non_blank("name", "Plank".into()).unwrap(), "Plank");
        assert!(non_blank("name", " \t".into()).is_err());
    }

    #[test]
    fn test_missing_fields_keeps_order() {
        let err = missing_fields([("cycle_id", true), ("exercise_id", false), ("sets", true)]);
        assert_eq!(
            err,
            StoreError::MissingFields { fields: vec!["cycle_id".into(), "sets".into()] }
        );
    }
}
