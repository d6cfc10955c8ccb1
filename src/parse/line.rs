//! Single-line classification.
//!
//! A physical transcript line is one of three things: a **header** opening
//! a new participant message, a **system entry** (timestamp but no
//! `Sender:` part), or a **continuation** of whatever came before. The
//! header regex is tried first; the system regex only gets lines the
//! header regex rejected, since every header also carries a timestamp
//! prefix.

use chrono::{DateTime, Utc};

use crate::locale::{self, Locale};

/// Trailing markers the platform appends to edited messages.
///
/// Compared case-insensitively after trimming.
const EDITED_MARKERS: &[&str] = &[
    "<this message was edited>",
    "<diese nachricht wurde bearbeitet.>",
    "<diese nachricht wurde bearbeitet>",
    "<se editó este mensaje>",
];

/// One classified transcript line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A line opening a new participant message.
    Header {
        /// Parsed timestamp; `None` when the digits matched but the date
        /// failed calendar validation.
        timestamp: Option<DateTime<Utc>>,
        /// Sender display name, trimmed.
        sender: String,
        /// Message body with any edited marker removed.
        body: String,
        /// The edited marker was present and stripped.
        edited: bool,
    },
    /// A timestamped line with no sender.
    System {
        /// Parsed timestamp, if valid.
        timestamp: Option<DateTime<Utc>>,
        /// Entry text.
        body: String,
    },
    /// Anything else; belongs to the preceding message.
    Continuation(String),
}

/// Classifies lines against one compiled locale.
#[derive(Debug, Clone)]
pub struct LineParser {
    locale: Locale,
}

impl LineParser {
    /// Creates a parser for the given locale.
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Returns the locale this parser matches against.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Classifies one physical line.
    ///
    /// Directional marks and BOMs are scrubbed before matching, so iOS
    /// exports with embedded LEFT-TO-RIGHT marks classify the same as
    /// clean Android ones.
    pub fn classify(&self, raw: &str) -> ParsedLine {
        let line = locale::scrub(raw);

        if let Some(caps) = self.locale.header_regex().captures(&line) {
            let date_str = caps.get(1).map_or("", |m| m.as_str());
            let time_str = caps.get(2).map_or("", |m| m.as_str());
            let sender = caps.get(3).map_or("", |m| m.as_str().trim());
            let body = caps.get(4).map_or("", |m| m.as_str());

            let timestamp = self.locale.parse_timestamp(date_str, time_str);
            if timestamp.is_none() {
                tracing::warn!(
                    date = date_str,
                    time = time_str,
                    "header matched but timestamp failed validation"
                );
            }

            let (body, edited) = strip_edited_marker(body);
            return ParsedLine::Header {
                timestamp,
                sender: sender.to_string(),
                body,
                edited,
            };
        }

        if let Some(caps) = self.locale.system_regex().captures(&line) {
            let date_str = caps.get(1).map_or("", |m| m.as_str());
            let time_str = caps.get(2).map_or("", |m| m.as_str());
            let body = caps.get(3).map_or("", |m| m.as_str());
            return ParsedLine::System {
                timestamp: self.locale.parse_timestamp(date_str, time_str),
                body: body.trim().to_string(),
            };
        }

        ParsedLine::Continuation(line.into_owned())
    }
}

/// Removes a trailing edited marker, reporting whether one was present.
fn strip_edited_marker(body: &str) -> (String, bool) {
    let trimmed = body.trim_end();
    for marker in EDITED_MARKERS {
        if trimmed.len() >= marker.len() {
            let cut = trimmed.len() - marker.len();
            if trimmed.is_char_boundary(cut) && trimmed[cut..].to_lowercase() == *marker {
                return (trimmed[..cut].trim_end().to_string(), true);
            }
        }
    }
    (body.to_string(), false)
}
