//! Shared utility functions for curves crates.

/// Date utility functions
pub mod dates {
    use chrono::{Duration, NaiveDate};

    /// Formats accepted for dates coming from upstream providers.
    ///
    /// NYT uses `2020-05-02`, CTP uses `20200502`, JHU column headers use `5/2/20`.
    const ACCEPTED_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%m/%d/%y", "%m/%d/%Y"];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
    }

    /// Parse a date string in "YYYYMMDD" format (CTP compact format)
    pub fn parse_date_compact(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y%m%d")?)
    }

    /// Parse a date in any of the formats used by the upstream providers.
    ///
    /// Two-digit years (`%y`) are tried before four-digit ones so that JHU
    /// headers like `1/22/20` land in 2020 rather than the year 20.
    pub fn parse_any_date(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        ACCEPTED_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }

    /// Day ordinal counted from 0001-01-01 (day 1), the proleptic Gregorian
    /// ordinal used for fitting trends against whole days.
    pub fn date_to_ordinal(date: &NaiveDate) -> i64 {
        // from_ymd_opt(1, 1, 1) is always valid
        let epoch = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
        (*date - epoch).num_days() + 1
    }

    /// Inverse of [`date_to_ordinal`].
    pub fn ordinal_to_date(ordinal: i64) -> Option<NaiveDate> {
        let epoch = NaiveDate::from_ymd_opt(1, 1, 1)?;
        epoch.checked_add_signed(Duration::days(ordinal - 1))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2020, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2020-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }

        #[test]
        fn test_parse_any_date() {
            let date = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
            assert_eq!(parse_any_date("2020-01-22"), Some(date));
            assert_eq!(parse_any_date("20200122"), Some(date));
            assert_eq!(parse_any_date("1/22/20"), Some(date));
            assert_eq!(parse_any_date("k8state"), None);
        }

        #[test]
        fn test_ordinal_round_trip() {
            let date = NaiveDate::from_ymd_opt(2020, 5, 2).unwrap();
            let ordinal = date_to_ordinal(&date);
            assert_eq!(ordinal_to_date(ordinal), Some(date));
            assert_eq!(ordinal_to_date(ordinal + 1), date.succ_opt());
            let first = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
            assert_eq!(date_to_ordinal(&first), 1);
        }
    }
}

/// Timestamp formatting for snapshot markers and series version names.
pub mod stamps {
    use chrono::{DateTime, Local};

    /// Format of the `when=<stamp>.txt` marker and archive entries.
    pub const NOW_FORMAT: &str = "%y-%m-%d-%H%M-%z";

    /// Hundredths of a second since the Unix epoch, used to name staging
    /// directories and archive entries.
    pub fn raw_timestamp(now: &DateTime<Local>) -> String {
        (now.timestamp_millis() / 10).to_string()
    }

    /// The human readable stamp written into marker names.
    pub fn now_stamp(now: &DateTime<Local>) -> String {
        now.format(NOW_FORMAT).to_string()
    }

    /// Renderings of a dataset time for labels and directory names.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TimedStyle {
        /// `02May20 12:52`
        Alpha,
        /// `2020-05-02-12.52.00`
        Formal,
        /// `2020-05-02 12:52:00`
        Spaced,
        /// `200502.125200`
        Compact,
    }

    pub fn timed_name(when: &DateTime<Local>, style: TimedStyle) -> String {
        let fmt = match style {
            TimedStyle::Alpha => "%d%b%y %H:%M",
            TimedStyle::Formal => "%Y-%m-%d-%H.%M.%S",
            TimedStyle::Spaced => "%Y-%m-%d %H:%M:%S",
            TimedStyle::Compact => "%y%m%d.%H%M%S",
        };
        when.format(fmt).to_string()
    }

}
