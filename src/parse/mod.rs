//! Transcript parsing: line classification and message assembly.
//!
//! Parsing is split in two. [`line::LineParser`] classifies one physical
//! line at a time (header, system entry, or continuation) and extracts the
//! header fields. [`assembler::ChatAssembler`] folds the classified lines
//! into sealed [`Message`](crate::Message) values, merging continuations
//! and pulling out attachment references.
//!
//! [`parse_transcript`] wires the two together with locale resolution and
//! is what most callers want.

pub mod assembler;
pub mod line;

pub use assembler::ChatAssembler;
pub use line::{LineParser, ParsedLine};

use crate::Message;
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::locale::{Locale, LocaleSpec};

/// How many leading non-empty lines feed locale auto-detection.
const DETECT_SAMPLE_LINES: usize = 20;

/// Parses a whole transcript into sealed messages.
///
/// Resolves the locale first (fixed id from the configuration, or
/// auto-detected from the first lines), then classifies and assembles
/// every line. Returns the messages together with the locale that was
/// used, so callers can report it.
///
/// # Errors
///
/// [`ReportError::UnknownFormat`] when no locale matches; an invalid fixed
/// locale id surfaces as [`ReportError::InvalidConfig`].
///
/// # Example
///
/// ```
/// use chatreport::config::ReportConfig;
/// use chatreport::parse::parse_transcript;
///
/// let text = "26.10.2025, 20:40 - Alice: Hello\n26.10.2025, 20:41 - Bob: Hi";
/// let (messages, spec) = parse_transcript(text, &ReportConfig::new()).unwrap();
/// assert_eq!(messages.len(), 2);
/// assert_eq!(spec.id, "eu-dot-dash");
/// ```
pub fn parse_transcript(
    content: &str,
    config: &ReportConfig,
) -> Result<(Vec<Message>, &'static LocaleSpec)> {
    let spec = resolve_locale(content, config)?;
    let locale = Locale::compile(spec);
    let parser = LineParser::new(locale);
    let mut assembler = ChatAssembler::new(config);

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        assembler.push(parser.classify(line));
    }

    Ok((assembler.finish(), spec))
}

/// Resolves the locale: configured id wins, otherwise auto-detection over
/// the first [`DETECT_SAMPLE_LINES`] non-empty lines.
pub fn resolve_locale(
    content: &str,
    config: &ReportConfig,
) -> Result<&'static LocaleSpec> {
    if let Some(id) = &config.locale {
        return LocaleSpec::by_id(id)
            .ok_or_else(|| ReportError::invalid_config(format!("unknown locale id '{id}'")));
    }

    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DETECT_SAMPLE_LINES)
        .collect();

    let spec = LocaleSpec::detect(&sample).ok_or_else(|| ReportError::unknown_format(None))?;
    tracing::debug!(locale = spec.id, "auto-detected transcript locale");
    Ok(spec)
}
