//! Locale-specific timestamp conventions, as data.
//!
//! WhatsApp exports vary by locale and platform: date order, separator,
//! bracketed vs dash-delimited headers, 12h vs 24h clocks, and the word used
//! in attachment markers. Instead of one hand-written regex per variant,
//! every convention is a row in [`LOCALES`] and both the header regex and
//! the chrono parse formats are derived from the row. Adding a locale never
//! touches parsing code.
//!
//! # Example
//!
//! ```
//! use chatreport::locale::{Locale, LocaleSpec};
//!
//! let lines = vec![
//!     "[15.01.24, 10:30:45] Alice: Hello",
//!     "[15.01.24, 10:31:00] Bob: Hi there",
//! ];
//! let spec = LocaleSpec::detect(&lines).unwrap();
//! assert_eq!(spec.id, "eu-dot-bracketed");
//!
//! let locale = Locale::compile(spec);
//! assert!(locale.parse_timestamp("15.01.24", "10:30:45").is_some());
//! ```

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

/// Which calendar field comes first in the date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// DD sep MM sep YY(YY) - most locales.
    DayFirst,
    /// MM sep DD sep YY(YY) - US exports.
    MonthFirst,
}

/// One row of the locale table.
///
/// A spec is pure data; [`Locale::compile`] turns it into a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleSpec {
    /// Stable identifier, usable from the CLI (`--locale eu-dot-dash`).
    pub id: &'static str,
    /// Date field order.
    pub order: DateOrder,
    /// Separator between date fields.
    pub separator: char,
    /// `[date, time] Sender:` when true, `date, time - Sender:` when false.
    pub bracketed: bool,
    /// Whether times may carry an AM/PM suffix.
    pub twelve_hour: bool,
    /// Words that introduce an attachment marker, e.g. `<attached: x.jpg>`.
    pub markers: &'static [&'static str],
}

/// All known export conventions, in detection priority order.
///
/// Ties during detection resolve to the earliest row, so more specific
/// conventions come first.
pub const LOCALES: &[LocaleSpec] = &[
    LocaleSpec {
        id: "us-bracketed",
        order: DateOrder::MonthFirst,
        separator: '/',
        bracketed: true,
        twelve_hour: true,
        markers: &["attached:"],
    },
    LocaleSpec {
        id: "us-dash",
        order: DateOrder::MonthFirst,
        separator: '/',
        bracketed: false,
        twelve_hour: true,
        markers: &["attached:"],
    },
    LocaleSpec {
        id: "eu-dot-bracketed",
        order: DateOrder::DayFirst,
        separator: '.',
        bracketed: true,
        twelve_hour: false,
        markers: &["attached:", "Anhang:"],
    },
    LocaleSpec {
        id: "eu-dot-dash",
        order: DateOrder::DayFirst,
        separator: '.',
        bracketed: false,
        twelve_hour: false,
        markers: &["attached:", "Anhang:"],
    },
    LocaleSpec {
        id: "eu-slash-bracketed",
        order: DateOrder::DayFirst,
        separator: '/',
        bracketed: true,
        twelve_hour: false,
        markers: &["attached:", "adjunto:", "pièce jointe :"],
    },
    LocaleSpec {
        id: "eu-slash-dash",
        order: DateOrder::DayFirst,
        separator: '/',
        bracketed: false,
        twelve_hour: false,
        markers: &["attached:", "adjunto:", "pièce jointe :"],
    },
];

impl LocaleSpec {
    /// Looks up a locale by its stable id.
    pub fn by_id(id: &str) -> Option<&'static LocaleSpec> {
        LOCALES.iter().find(|spec| spec.id == id)
    }

    /// Auto-detects the convention by scoring sample lines.
    ///
    /// Every locale's header regex is run over the samples; a line counts
    /// for a row only when the captured date and time also parse under that
    /// row's formats. The highest count wins, ties going to the earlier
    /// table row. Returns `None` when no row scores on any line.
    pub fn detect(lines: &[&str]) -> Option<&'static LocaleSpec> {
        let compiled: Vec<Locale> = LOCALES.iter().map(Locale::compile).collect();

        let mut scores = vec![0usize; compiled.len()];
        for line in lines {
            let line = scrub(line);
            for (i, locale) in compiled.iter().enumerate() {
                // The us-dash regex also matches 24h day-first lines; the
                // parse check is what rejects a day value in the month slot.
                if let Some(caps) = locale.header.captures(&line) {
                    if locale.parse_timestamp(&caps[1], &caps[2]).is_some() {
                        scores[i] += 1;
                    }
                }
            }
        }

        let max_score = *scores.iter().max()?;
        if max_score == 0 {
            return None;
        }

        let winner_idx = scores.iter().position(|&s| s == max_score)?;
        Some(&LOCALES[winner_idx])
    }

    /// All marker words across the whole table.
    ///
    /// iOS exports use the device language for markers regardless of the
    /// date convention, so marker matching is deliberately cross-locale.
    pub fn all_markers() -> impl Iterator<Item = &'static str> {
        LOCALES.iter().flat_map(|spec| spec.markers.iter().copied())
    }

    fn date_pattern(&self) -> String {
        let sep = regex::escape(&self.separator.to_string());
        format!(r"\d{{1,2}}{sep}\d{{1,2}}{sep}\d{{2,4}}")
    }

    fn time_pattern(&self) -> &'static str {
        if self.twelve_hour {
            r"\d{1,2}:\d{2}(?::\d{2})?(?:\s?[APap][Mm])?"
        } else {
            r"\d{1,2}:\d{2}(?::\d{2})?"
        }
    }

    /// Builds the header regex for this convention.
    ///
    /// Four capture groups: date, time, sender, body. The sender group is
    /// non-greedy so a colon inside the body does not extend it.
    fn header_pattern(&self) -> String {
        let date = self.date_pattern();
        let time = self.time_pattern();
        if self.bracketed {
            format!(r"^\[({date}),\s({time})\]\s([^:]+?)\s?:\s?(.*)$")
        } else {
            format!(r"^({date}),\s({time})\s-\s([^:]+?)\s?:\s?(.*)$")
        }
    }

    /// Builds the system-entry regex: a timestamp prefix with no sender.
    ///
    /// Two capture groups: date/time combined capture layout as the header
    /// (date, time) plus the body. Must be tried only after the header
    /// regex fails, since every header line also has a timestamp prefix.
    fn system_pattern(&self) -> String {
        let date = self.date_pattern();
        let time = self.time_pattern();
        if self.bracketed {
            format!(r"^\[({date}),\s({time})\]\s(.*)$")
        } else {
            format!(r"^({date}),\s({time})\s-\s(.*)$")
        }
    }

    /// Derives the chrono parse formats for this convention.
    ///
    /// Two-digit and four-digit years, optional seconds, and (for 12h
    /// locales) optional AM/PM with or without a preceding space.
    fn parse_formats(&self) -> Vec<String> {
        let sep = self.separator;
        let date_formats: [String; 2] = match self.order {
            DateOrder::DayFirst => [format!("%d{sep}%m{sep}%y"), format!("%d{sep}%m{sep}%Y")],
            DateOrder::MonthFirst => [format!("%m{sep}%d{sep}%y"), format!("%m{sep}%d{sep}%Y")],
        };

        let mut time_formats: Vec<&'static str> = Vec::new();
        if self.twelve_hour {
            time_formats.extend_from_slice(&[
                "%I:%M:%S %p",
                "%I:%M %p",
                "%I:%M:%S%p",
                "%I:%M%p",
            ]);
        }
        time_formats.extend_from_slice(&["%H:%M:%S", "%H:%M"]);

        let mut formats = Vec::with_capacity(date_formats.len() * time_formats.len());
        for date in &date_formats {
            for time in &time_formats {
                formats.push(format!("{date}, {time}"));
            }
        }
        formats
    }
}

/// A compiled locale: the table row plus its derived regexes and parse formats.
#[derive(Debug, Clone)]
pub struct Locale {
    spec: &'static LocaleSpec,
    header: Regex,
    system: Regex,
    formats: Vec<String>,
}

impl Locale {
    /// Compiles a table row into a matcher.
    pub fn compile(spec: &'static LocaleSpec) -> Self {
        // Table-derived patterns are valid by construction (covered by tests
        // over every row), so compilation cannot fail here.
        Self {
            spec,
            header: Regex::new(&spec.header_pattern()).unwrap(),
            system: Regex::new(&spec.system_pattern()).unwrap(),
            formats: spec.parse_formats(),
        }
    }

    /// Returns the underlying table row.
    pub fn spec(&self) -> &'static LocaleSpec {
        self.spec
    }

    /// The header regex (captures: date, time, sender, body).
    pub fn header_regex(&self) -> &Regex {
        &self.header
    }

    /// The system-entry regex (captures: date, time, body).
    pub fn system_regex(&self) -> &Regex {
        &self.system
    }

    /// Parses a date and time string pair into a UTC timestamp.
    ///
    /// Exports carry no zone information, so the naive local time is taken
    /// as UTC. Returns `None` when no derived format accepts the pair,
    /// including calendar-invalid dates like `31.02.24`.
    pub fn parse_timestamp(&self, date_str: &str, time_str: &str) -> Option<DateTime<Utc>> {
        let time_str = if self.spec.twelve_hour {
            time_str.to_ascii_uppercase()
        } else {
            time_str.to_string()
        };
        let datetime_str = format!("{date_str}, {}", time_str.trim());

        for format in &self.formats {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&datetime_str, format) {
                return Some(naive.and_utc());
            }
        }
        None
    }
}

/// Removes the characters exports hide inside lines: a BOM at the start and
/// LEFT-TO-RIGHT / RIGHT-TO-LEFT marks anywhere.
///
/// Returns a borrowed slice when the line is already clean.
pub fn scrub(line: &str) -> Cow<'_, str> {
    const MARKS: [char; 3] = ['\u{FEFF}', '\u{200E}', '\u{200F}'];
    if line.contains(MARKS) {
        Cow::Owned(line.replace(MARKS, ""))
    } else {
        Cow::Borrowed(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rows_compile() {
        for spec in LOCALES {
            let locale = Locale::compile(spec);
            assert!(!locale.formats.is_empty());
        }
    }

    #[test]
    fn test_by_id() {
        assert!(LocaleSpec::by_id("eu-dot-dash").is_some());
        assert!(LocaleSpec::by_id("nonsense").is_none());
    }

    #[test]
    fn test_detect_us_bracketed() {
        let lines = vec![
            "[1/15/24, 10:30:45 AM] Alice: Hello",
            "[1/15/24, 10:31:00 AM] Bob: Hi there",
        ];
        assert_eq!(LocaleSpec::detect(&lines).map(|s| s.id), Some("us-bracketed"));
    }

    #[test]
    fn test_detect_eu_dot_bracketed() {
        let lines = vec![
            "[15.01.24, 10:30:45] Alice: Hello",
            "[15.01.24, 10:31:00] Bob: Hi there",
        ];
        assert_eq!(
            LocaleSpec::detect(&lines).map(|s| s.id),
            Some("eu-dot-bracketed")
        );
    }

    #[test]
    fn test_detect_eu_dot_dash() {
        let lines = vec![
            "26.10.2025, 20:40 - Alice: Hello",
            "26.10.2025, 20:41 - Bob: Hi there",
        ];
        assert_eq!(LocaleSpec::detect(&lines).map(|s| s.id), Some("eu-dot-dash"));
    }

    #[test]
    fn test_detect_eu_slash_dash() {
        let lines = vec![
            "15/01/2024, 10:30 - Alice: Hello",
            "15/01/2024, 10:31 - Bob: Hi there",
        ];
        assert_eq!(
            LocaleSpec::detect(&lines).map(|s| s.id),
            Some("eu-slash-dash")
        );
    }

    #[test]
    fn test_detect_day_first_slash_beats_month_first() {
        // 15 is not a month, so the us rows match the regex but fail the
        // parse check and score zero.
        let dash = vec!["15/01/2024, 10:30 - Alice: Hello"];
        assert_eq!(
            LocaleSpec::detect(&dash).map(|s| s.id),
            Some("eu-slash-dash")
        );

        let bracketed = vec!["[15/01/2024, 10:30] Alice: Hello"];
        assert_eq!(
            LocaleSpec::detect(&bracketed).map(|s| s.id),
            Some("eu-slash-bracketed")
        );
    }

    #[test]
    fn test_detect_nothing() {
        let lines = vec!["just some text", "no timestamps here"];
        assert!(LocaleSpec::detect(&lines).is_none());
    }

    #[test]
    fn test_detect_majority_wins() {
        // One stray bracketed line in a dash-formatted chat.
        let lines = vec![
            "26.10.2025, 20:40 - Alice: Hello",
            "[15.01.24, 10:30:45] Bob: ancient paste",
            "26.10.2025, 20:41 - Alice: again",
            "26.10.2025, 20:42 - Bob: ok",
        ];
        assert_eq!(LocaleSpec::detect(&lines).map(|s| s.id), Some("eu-dot-dash"));
    }

    #[test]
    fn test_detect_scrubs_directional_marks() {
        let lines = vec!["\u{200E}[15.01.24, 10:30:45] Alice: \u{200E}photo"];
        assert_eq!(
            LocaleSpec::detect(&lines).map(|s| s.id),
            Some("eu-dot-bracketed")
        );
    }

    #[test]
    fn test_header_captures() {
        let locale = Locale::compile(LocaleSpec::by_id("eu-dot-dash").unwrap());
        let caps = locale
            .header_regex()
            .captures("26.10.2025, 20:40 - Alice Smith: Hello there: really")
            .unwrap();
        assert_eq!(&caps[1], "26.10.2025");
        assert_eq!(&caps[2], "20:40");
        assert_eq!(&caps[3], "Alice Smith");
        assert_eq!(&caps[4], "Hello there: really");
    }

    #[test]
    fn test_system_pattern_matches_senderless() {
        let locale = Locale::compile(LocaleSpec::by_id("eu-dot-dash").unwrap());
        let line = "26.10.2025, 20:40 - Messages are end-to-end encrypted";
        // no colon, so the header regex cannot claim it
        assert!(!locale.header_regex().is_match(line));
        let caps = locale.system_regex().captures(line).unwrap();
        assert_eq!(&caps[3], "Messages are end-to-end encrypted");
    }

    #[test]
    fn test_parse_timestamp_us() {
        let locale = Locale::compile(LocaleSpec::by_id("us-bracketed").unwrap());
        let ts = locale.parse_timestamp("1/15/24", "10:30:45 AM");
        assert!(ts.is_some());
        // am/pm case and missing space are tolerated
        assert!(locale.parse_timestamp("1/15/24", "10:30pm").is_some());
    }

    #[test]
    fn test_parse_timestamp_eu() {
        let locale = Locale::compile(LocaleSpec::by_id("eu-dot-dash").unwrap());
        assert!(locale.parse_timestamp("26.10.2025", "20:40").is_some());
        assert!(locale.parse_timestamp("26.10.25", "20:40:12").is_some());
    }

    #[test]
    fn test_parse_timestamp_rejects_invalid_date() {
        let locale = Locale::compile(LocaleSpec::by_id("eu-dot-dash").unwrap());
        assert!(locale.parse_timestamp("31.02.24", "10:00").is_none());
        assert!(locale.parse_timestamp("15.01.24", "25:77").is_none());
    }

    #[test]
    fn test_parse_timestamp_order_matters() {
        let us = Locale::compile(LocaleSpec::by_id("us-bracketed").unwrap());
        let ts = us.parse_timestamp("1/15/24", "10:30").unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-01-15");

        let eu = Locale::compile(LocaleSpec::by_id("eu-slash-dash").unwrap());
        let ts = eu.parse_timestamp("15/01/24", "10:30").unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn test_scrub() {
        assert_eq!(scrub("plain"), "plain");
        assert_eq!(scrub("\u{FEFF}bom"), "bom");
        assert_eq!(scrub("a\u{200E}b\u{200F}c"), "abc");
        assert!(matches!(scrub("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_all_markers_contains_every_language() {
        let markers: Vec<&str> = LocaleSpec::all_markers().collect();
        assert!(markers.contains(&"attached:"));
        assert!(markers.contains(&"Anhang:"));
    }
}
