// KioskLog - core/filter.rs
//
// Date-range predicate applied to log files before they are read.
// Core layer: pure logic, no I/O dependencies.

use crate::util::error::ConfigError;
use chrono::NaiveDate;
use std::fmt;

/// Inclusive date range. A missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Returns true if no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Returns true if the range cannot contain any date.
    pub fn is_empty(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    /// Replace whichever bounds are given, keeping the others.
    ///
    /// Fails if the merged range is inverted, so a typo on the command line
    /// never silently produces an empty report.
    pub fn with_overrides(
        self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self, ConfigError> {
        let merged = Self {
            from: from.or(self.from),
            to: to.or(self.to),
        };
        if merged.is_empty() {
            return Err(ConfigError::ValueOutOfRange {
                field: "--from/--to".to_string(),
                value: merged.to_string(),
                expected: "a start date on or before the end date".to_string(),
            });
        }
        Ok(merged)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |d: Option<NaiveDate>| d.map_or_else(|| "*".to_string(), |d| d.to_string());
        write!(f, "{} .. {}", side(self.from), side(self.to))
    }
}

/// Parse a `YYYY-MM-DD` date as typed on the command line or in config.
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{input}' (expected YYYY-MM-DD): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_unbounded_contains_everything() {
        let range = DateRange::default();
        assert!(range.is_unbounded());
        assert!(range.contains(d("1999-01-01")));
        assert!(range.contains(d("2099-12-31")));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::new(Some(d("2025-02-01")), Some(d("2025-02-28")));
        assert!(range.contains(d("2025-02-01")));
        assert!(range.contains(d("2025-02-28")));
        assert!(!range.contains(d("2025-01-31")));
        assert!(!range.contains(d("2025-03-01")));
    }

    #[test]
    fn test_half_open_ranges() {
        let from_only = DateRange::new(Some(d("2025-02-10")), None);
        assert!(!from_only.contains(d("2025-02-09")));
        assert!(from_only.contains(d("2030-01-01")));

        let to_only = DateRange::new(None, Some(d("2025-02-10")));
        assert!(to_only.contains(d("2000-01-01")));
        assert!(!to_only.contains(d("2025-02-11")));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = DateRange::new(Some(d("2025-03-01")), Some(d("2025-02-01")));
        assert!(range.is_empty());
        assert!(!range.contains(d("2025-02-15")));
    }

    #[test]
    fn test_overrides_replace_only_given_bounds() {
        let base = DateRange::new(Some(d("2025-02-01")), Some(d("2025-02-28")));
        let merged = base.with_overrides(None, Some(d("2025-02-10"))).unwrap();
        assert_eq!(merged, DateRange::new(Some(d("2025-02-01")), Some(d("2025-02-10"))));
        assert_eq!(base.with_overrides(None, None).unwrap(), base);
    }

    #[test]
    fn test_overrides_reject_inverted_range() {
        let err = DateRange::default()
            .with_overrides(Some(d("2025-03-01")), Some(d("2025-02-01")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));

        // A single flag can invert a range taken from config.
        let from_config = DateRange::new(Some(d("2025-02-10")), None);
        assert!(from_config.with_overrides(None, Some(d("2025-02-01"))).is_err());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2025/02/10").is_err());
        assert!(parse_date("2025-02-30").is_err());
        assert_eq!(parse_date(" 2025-02-10 ").unwrap(), d("2025-02-10"));
    }

    #[test]
    fn test_display() {
        let range = DateRange::new(Some(d("2025-02-01")), None);
        assert_eq!(range.to_string(), "2025-02-01 .. *");
    }
}
