// KioskLog - core/parser.rs
//
// Line grammar for kiosk client logs. Pure functions over strings; the app
// layer handles reading files out of archives.
//
// Accepted shapes (after trimming the whole line):
//   09:24:12 645 [ServiceUnavailableHelper.CheckServerConnect]服务器状态：False
//   10:20:28.389 [Info]启动MQTT重连定时器

use crate::core::model::ParsedLine;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// `HH:MM:SS`, then a sequence number or `.mmm`, then `[tag]`, then the message.
const LINE_PATTERN: &str = r"^(\d{2}:\d{2}:\d{2})(?:\s+\d+\s+|\.\d{3}\s*)\[[^\]]+\](.*)";

/// First `YYYY-MM-DD` anywhere in a file name.
const FILE_DATE_PATTERN: &str = r"(\d{4}-\d{2}-\d{2})";

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The pattern is a compile-time constant covered by the tests below.
    RE.get_or_init(|| Regex::new(LINE_PATTERN).expect("parser: invalid line regex"))
}

fn file_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FILE_DATE_PATTERN).expect("parser: invalid date regex"))
}

/// Split one raw log line into its time and message.
///
/// Returns `None` for any line that does not follow the grammar: blank
/// lines, stack-trace continuations, banners and so on. This is the normal
/// "no event" path, not an error.
pub fn parse_line(raw: &str) -> Option<ParsedLine> {
    let caps = line_regex().captures(raw.trim())?;
    Some(ParsedLine {
        time: caps[1].to_string(),
        message: caps[2].trim().to_string(),
    })
}

/// Extract the calendar date embedded in a log file name.
///
/// Only the first `YYYY-MM-DD` occurrence is considered. Returns `None` when
/// there is none or when it is not a real date (e.g. `2025-02-30`).
pub fn extract_file_date(file_name: &str) -> Option<NaiveDate> {
    let m = file_date_regex().find(file_name)?;
    NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(time: &str, message: &str) -> Option<ParsedLine> {
        Some(ParsedLine {
            time: time.to_string(),
            message: message.to_string(),
        })
    }

    #[test]
    fn test_parse_sequence_variant() {
        assert_eq!(
            parse_line("09:24:12 645 [ServiceUnavailableHelper.CheckServerConnect]服务器状态：False"),
            parsed("09:24:12", "服务器状态：False")
        );
    }

    #[test]
    fn test_parse_millisecond_variant() {
        assert_eq!(
            parse_line("10:20:28.389 [Info]启动MQTT重连定时器"),
            parsed("10:20:28", "启动MQTT重连定时器")
        );
        assert_eq!(
            parse_line("10:20:28.389   [Info] spaced"),
            parsed("10:20:28", "spaced")
        );
    }

    #[test]
    fn test_parse_trims_line_and_message() {
        assert_eq!(
            parse_line("  10:15:00 001 [X]   确认了退出操作  \r"),
            parsed("10:15:00", "确认了退出操作")
        );
    }

    #[test]
    fn test_parse_empty_message_is_allowed() {
        assert_eq!(parse_line("10:15:00 001 [X]"), parsed("10:15:00", ""));
    }

    #[test]
    fn test_parse_rejects_non_matching_lines() {
        for line in [
            "bad input no timestamp",
            "",
            "   ",
            "10:15:00 [X] missing sequence",
            "10:15:00 001 X no tag",
            "10:15:00 001 [] empty tag",
            "10:15:00.38 [X] two-digit millis",
            "10:15:00.3899 [X] four-digit millis",
            "1:15:00 001 [X] one-digit hour",
            "10:15:00001 [X] no separator",
            "at com.example.Client.connect(Client.java:42)",
        ] {
            assert_eq!(parse_line(line), None, "line should not match: {line:?}");
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let line = "10:16:00 002 [X]获取到当前的系统默认的代理参数,本地配置为空";
        assert_eq!(parse_line(line), parse_line(line));
    }

    #[test]
    fn test_parse_keeps_out_of_range_time_text() {
        // The grammar only checks digit shape; validation happens on demand.
        let line = parse_line("25:61:00 001 [X]msg").unwrap();
        assert_eq!(line.time, "25:61:00");
        assert!(line.time_of_day().is_err());
    }

    #[test]
    fn test_parse_message_may_contain_brackets() {
        assert_eq!(
            parse_line("08:00:00 7 [Main] retry [3/3] failed"),
            parsed("08:00:00", "retry [3/3] failed")
        );
    }

    #[test]
    fn test_extract_file_date() {
        assert_eq!(
            extract_file_date("2025-02-10_local.log"),
            NaiveDate::from_ymd_opt(2025, 2, 10)
        );
        assert_eq!(
            extract_file_date("client_2024-12-31_2025-01-01_local.log"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(extract_file_date("local.log"), None);
        assert_eq!(extract_file_date("2025-02-30_local.log"), None);
    }
}
