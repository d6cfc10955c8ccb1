//! Folding classified lines into sealed messages.
//!
//! The assembler owns all cross-line state: the message currently being
//! built, continuation merging, and attachment extraction. Attachment
//! references come from two sources in a body: explicit markers
//! (`<attached: IMG-....jpg>`, localized) and bare export-convention
//! filenames Android transcripts drop inline. Order of appearance is
//! preserved and a filename inside a marker is never counted twice.

use regex::Regex;

use crate::config::ReportConfig;
use crate::locale::LocaleSpec;
use crate::message::{AttachmentRef, Message};
use crate::parse::line::ParsedLine;

/// Bare filenames in WhatsApp export conventions.
///
/// Android style (`IMG-20240101-WA0001.jpg`) and iOS style
/// (`00000012-PHOTO-2024-01-01-12-00-00.jpg`).
const BARE_FILENAME_PATTERN: &str = concat!(
    r"\b(?:",
    r"(?:IMG|VID|AUD|PTT|DOC|STK)-\d{8}-WA\d{4,5}",
    r"|",
    r"\d{8}-(?:PHOTO|VIDEO|AUDIO|STICKER|GIF|DOC)-\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}",
    r")\.[A-Za-z0-9]{1,4}\b"
);

/// Stateful fold from classified lines to sealed messages.
///
/// # Example
///
/// ```
/// use chatreport::config::ReportConfig;
/// use chatreport::parse::{ChatAssembler, ParsedLine};
///
/// let config = ReportConfig::new();
/// let mut asm = ChatAssembler::new(&config);
/// asm.push(ParsedLine::Header {
///     timestamp: None,
///     sender: "Alice".into(),
///     body: "first line".into(),
///     edited: false,
/// });
/// asm.push(ParsedLine::Continuation("second line".into()));
/// let messages = asm.finish();
/// assert_eq!(messages[0].content(), "first line\nsecond line");
/// ```
pub struct ChatAssembler {
    strip_markers: bool,
    marker_regex: Regex,
    bare_regex: Regex,
    messages: Vec<Message>,
    current: Option<Message>,
    discarded_leading: usize,
}

impl ChatAssembler {
    /// Creates an assembler configured from `config`.
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            strip_markers: config.strip_markers,
            marker_regex: build_marker_regex(),
            bare_regex: Regex::new(BARE_FILENAME_PATTERN).unwrap(),
            messages: Vec::new(),
            current: None,
            discarded_leading: 0,
        }
    }

    /// Folds one classified line into the state.
    pub fn push(&mut self, line: ParsedLine) {
        match line {
            ParsedLine::Header {
                timestamp,
                sender,
                body,
                edited,
            } => {
                self.seal();
                let (content, refs) = self.extract(&body);
                let mut msg = Message::new(sender, content);
                msg.timestamp = timestamp;
                msg.attachments = refs;
                msg.is_edited = edited;
                self.current = Some(msg);
            }
            ParsedLine::System { timestamp, body } => {
                self.seal();
                let mut msg = Message::system(body);
                msg.timestamp = timestamp;
                self.current = Some(msg);
            }
            ParsedLine::Continuation(text) => {
                if self.current.is_none() {
                    self.discarded_leading += 1;
                    tracing::warn!(
                        line = %text,
                        "discarding continuation line before first header"
                    );
                    return;
                }
                let (content, refs) = self.extract(&text);
                if let Some(msg) = &mut self.current {
                    if !content.is_empty() {
                        if !msg.content.is_empty() {
                            msg.content.push('\n');
                        }
                        msg.content.push_str(&content);
                    }
                    msg.attachments.extend(refs);
                }
            }
        }
    }

    /// Seals the pending message and returns everything assembled so far.
    pub fn finish(mut self) -> Vec<Message> {
        self.seal();
        if self.discarded_leading > 0 {
            tracing::warn!(
                count = self.discarded_leading,
                "transcript began mid-message; leading lines were discarded"
            );
        }
        self.messages
    }

    /// Number of leading continuation lines discarded so far.
    pub fn discarded_leading(&self) -> usize {
        self.discarded_leading
    }

    fn seal(&mut self) {
        if let Some(msg) = self.current.take() {
            self.messages.push(msg);
        }
    }

    /// Extracts attachment references from a body fragment, in order of
    /// appearance, and returns the (optionally marker-stripped) text.
    fn extract(&self, text: &str) -> (String, Vec<AttachmentRef>) {
        // (span start, span end to strip, filename); bare mentions strip
        // nothing, so their span is empty.
        let mut found: Vec<(usize, usize, String)> = Vec::new();

        for caps in self.marker_regex.captures_iter(text) {
            if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                found.push((whole.start(), whole.end(), name.as_str().trim().to_string()));
            }
        }

        for m in self.bare_regex.find_iter(text) {
            let inside_marker = found
                .iter()
                .any(|&(s, e, _)| m.start() >= s && m.end() <= e);
            if !inside_marker {
                found.push((m.start(), m.start(), m.as_str().to_string()));
            }
        }

        found.sort_by_key(|&(start, _, _)| start);

        let refs = found
            .iter()
            .map(|(_, _, name)| AttachmentRef::from_filename(name.clone()))
            .collect();

        let content = if self.strip_markers {
            let mut out = String::with_capacity(text.len());
            let mut pos = 0;
            for &(start, end, _) in &found {
                if end > start {
                    out.push_str(&text[pos..start]);
                    pos = end;
                }
            }
            out.push_str(&text[pos..]);
            out.trim().to_string()
        } else {
            text.to_string()
        };

        (content, refs)
    }
}

/// Builds the marker regex from every marker word in the locale table.
///
/// Markers are matched cross-locale: the date convention and the device
/// language are independent in practice.
fn build_marker_regex() -> Regex {
    let mut words: Vec<String> = LocaleSpec::all_markers()
        .map(|w| regex::escape(w.trim_end_matches(':').trim()))
        .collect();
    words.sort();
    words.dedup();

    let pattern = format!(r"<\s*(?:{})\s*:\s*([^<>]+?)\s*>", words.join("|"));
    Regex::new(&pattern).unwrap()
}
