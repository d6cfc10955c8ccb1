//! Chat statistics collected over an assembled report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Message;
use crate::render::Artifact;
use crate::report::{BlockBody, Report};

/// Aggregate numbers for one run, suitable for printing or serializing.
///
/// Sender and media maps are ordered so output is deterministic.
#[derive(Debug, Default, Serialize)]
pub struct ChatStats {
    /// Total sealed messages, system entries included.
    pub total_messages: usize,
    /// System entries among them.
    pub system_messages: usize,
    /// Messages carrying the edited marker.
    pub edited_messages: usize,
    /// Messages per sender.
    pub messages_per_sender: BTreeMap<String, usize>,
    /// Attachment references per media kind label.
    pub attachments_per_kind: BTreeMap<String, usize>,
    /// Attachment references in total.
    pub total_attachments: usize,
    /// Attachments that rendered as placeholders, per failure label.
    pub failed_attachments: BTreeMap<String, usize>,
    /// Earliest message timestamp.
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Latest message timestamp.
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl ChatStats {
    /// Collects statistics from messages and the report built from them.
    pub fn collect(messages: &[Message], report: &Report) -> Self {
        let mut stats = ChatStats::default();

        for msg in messages {
            stats.total_messages += 1;
            if msg.is_system {
                stats.system_messages += 1;
            } else if !msg.sender.is_empty() {
                *stats
                    .messages_per_sender
                    .entry(msg.sender.clone())
                    .or_insert(0) += 1;
            }
            if msg.is_edited {
                stats.edited_messages += 1;
            }
            for att in msg.attachments() {
                stats.total_attachments += 1;
                *stats
                    .attachments_per_kind
                    .entry(att.kind.label().to_string())
                    .or_insert(0) += 1;
            }
            if let Some(ts) = msg.timestamp {
                stats.first_timestamp = Some(stats.first_timestamp.map_or(ts, |t| t.min(ts)));
                stats.last_timestamp = Some(stats.last_timestamp.map_or(ts, |t| t.max(ts)));
            }
        }

        for block in &report.blocks {
            if let BlockBody::Attachment(rendered) = &block.body {
                if let Artifact::Placeholder(reason) = &rendered.artifact {
                    *stats
                        .failed_attachments
                        .entry(reason.label().to_string())
                        .or_insert(0) += 1;
                }
            }
        }

        stats
    }

    /// Total placeholder renders.
    pub fn total_failed(&self) -> usize {
        self.failed_attachments.values().sum()
    }
}

impl fmt::Display for ChatStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages:      {}", self.total_messages)?;
        writeln!(f, "  system:      {}", self.system_messages)?;
        writeln!(f, "  edited:      {}", self.edited_messages)?;
        if let (Some(first), Some(last)) = (self.first_timestamp, self.last_timestamp) {
            writeln!(
                f,
                "Range:         {} .. {}",
                first.format("%Y-%m-%d %H:%M"),
                last.format("%Y-%m-%d %H:%M")
            )?;
        }
        writeln!(f, "Attachments:   {}", self.total_attachments)?;
        for (kind, count) in &self.attachments_per_kind {
            writeln!(f, "  {kind}: {count}")?;
        }
        if self.total_failed() > 0 {
            writeln!(f, "Failures:      {}", self.total_failed())?;
            for (reason, count) in &self.failed_attachments {
                writeln!(f, "  {reason}: {count}")?;
            }
        }
        write!(f, "Senders:       {}", self.messages_per_sender.len())?;
        for (sender, count) in &self.messages_per_sender {
            write!(f, "\n  {sender}: {count}")?;
        }
        Ok(())
    }
}
