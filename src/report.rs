//! Report assembly: messages and rendered media in page order.
//!
//! [`ReportBuilder`] walks sealed messages in transcript order and emits
//! [`PageBlock`]s: one text block per message with content, followed by one
//! attachment block per reference, in order of appearance. It also collects
//! [`AttachmentDoc`]s, the per-attachment document sequence; each doc is a
//! view onto the same reference-counted artifact the page block holds, so
//! nothing is decoded or rendered twice.
//!
//! Writing a report to disk produces one PNG per image artifact plus a JSON
//! manifest tying blocks, files and failures together for the document
//! backend.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Message;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::message::AttachmentKind;
use crate::render::{Artifact, AttachmentRenderer, RenderedAttachment};

/// The payload of one page block.
#[derive(Debug, Clone)]
pub enum BlockBody {
    /// Message text.
    Text(String),
    /// One rendered attachment.
    Attachment(RenderedAttachment),
}

/// One block on the report page, in final order.
#[derive(Debug, Clone)]
pub struct PageBlock {
    /// Sender display name; empty for system entries.
    pub sender: String,
    /// Message timestamp, when known.
    pub timestamp: Option<DateTime<Utc>>,
    /// This block belongs to the device owner's side of the chat.
    pub from_owner: bool,
    /// The owning message is a platform notice.
    pub is_system: bool,
    /// The owning message was edited.
    pub is_edited: bool,
    /// Text or attachment payload.
    pub body: BlockBody,
}

/// A standalone per-attachment document: the artifact plus its caption.
///
/// Docs share artifacts with the page blocks via `Arc`; building them adds
/// no rendering work.
#[derive(Debug, Clone)]
pub struct AttachmentDoc {
    /// Base filename of the attachment.
    pub filename: String,
    /// Media category.
    pub kind: AttachmentKind,
    /// Caption line: sender, timestamp, and the message text if any.
    pub caption: String,
    /// The shared rendering result.
    pub artifact: Artifact,
}

/// A fully assembled report.
#[derive(Debug)]
pub struct Report {
    /// Page blocks in final order.
    pub blocks: Vec<PageBlock>,
    /// Per-attachment documents, in attachment order.
    pub attachment_docs: Vec<AttachmentDoc>,
    /// The sender tagged as device owner, when one could be determined.
    pub owner: Option<String>,
}

impl Report {
    /// Number of attachment blocks that rendered as placeholders.
    pub fn failed_attachments(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| {
                matches!(&b.body, BlockBody::Attachment(r) if r.artifact.is_placeholder())
            })
            .count()
    }

    /// Writes image artifacts as PNG files and returns the manifest.
    ///
    /// Files are named `block0007-2.png` (block index, frame index). The
    /// manifest carries every block in order, with text inline and image
    /// artifacts referenced by the files written here.
    pub fn write_artifacts(&self, dir: &Path) -> Result<Manifest> {
        std::fs::create_dir_all(dir)?;

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (idx, block) in self.blocks.iter().enumerate() {
            blocks.push(self.manifest_block(idx, block, dir)?);
        }

        Ok(Manifest {
            owner: self.owner.clone(),
            block_count: self.blocks.len(),
            attachment_doc_count: self.attachment_docs.len(),
            blocks,
        })
    }

    fn manifest_block(&self, idx: usize, block: &PageBlock, dir: &Path) -> Result<ManifestBlock> {
        let mut out = ManifestBlock {
            sender: block.sender.clone(),
            timestamp: block.timestamp,
            from_owner: block.from_owner,
            is_system: block.is_system,
            is_edited: block.is_edited,
            kind: "text",
            text: None,
            filename: None,
            media: None,
            files: Vec::new(),
            failure: None,
        };

        match &block.body {
            BlockBody::Text(text) => {
                out.text = Some(text.clone());
            }
            BlockBody::Attachment(rendered) => {
                out.kind = "attachment";
                out.filename = Some(rendered.reference.filename.clone());
                out.media = Some(rendered.reference.kind);
                match &rendered.artifact {
                    Artifact::Image(img) => {
                        let name = format!("block{idx:04}-0.png");
                        img.save(dir.join(&name))?;
                        out.files.push(name);
                    }
                    Artifact::FrameGrid(frames) => {
                        for (n, frame) in frames.iter().enumerate() {
                            let name = format!("block{idx:04}-{n}.png");
                            frame.save(dir.join(&name))?;
                            out.files.push(name);
                        }
                    }
                    Artifact::Transcript(text) => {
                        out.text = Some(text.clone());
                    }
                    Artifact::Empty => {}
                    Artifact::Placeholder(reason) => {
                        out.failure = Some(reason.clone());
                    }
                }
            }
        }

        Ok(out)
    }
}

/// Serializable report manifest for the document backend.
#[derive(Debug, Serialize)]
pub struct Manifest {
    /// Detected or configured device owner.
    pub owner: Option<String>,
    /// Total page blocks.
    pub block_count: usize,
    /// Total per-attachment documents.
    pub attachment_doc_count: usize,
    /// Blocks in page order.
    pub blocks: Vec<ManifestBlock>,
}

/// One manifest entry.
#[derive(Debug, Serialize)]
pub struct ManifestBlock {
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub from_owner: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_system: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_edited: bool,
    /// `"text"` or `"attachment"`.
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<AttachmentKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<crate::render::FailureReason>,
}

/// Builds reports from sealed messages.
pub struct ReportBuilder<'a> {
    config: &'a ReportConfig,
}

impl<'a> ReportBuilder<'a> {
    /// Creates a builder over a configuration.
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Assembles the report.
    ///
    /// Pass `None` as the renderer to skip attachment rendering entirely
    /// (the configuration's `include_attachments = false` path); messages
    /// then produce text blocks only.
    pub fn build(
        &self,
        messages: &[Message],
        renderer: Option<&AttachmentRenderer<'_>>,
    ) -> Report {
        let owner = self
            .config
            .device_owner
            .clone()
            .or_else(|| detect_owner(messages));

        let mut blocks = Vec::new();
        let mut attachment_docs = Vec::new();

        for msg in messages {
            let from_owner =
                !msg.is_system && owner.as_deref() == Some(msg.sender()) && !msg.sender.is_empty();

            if !msg.content.trim().is_empty() || msg.attachments.is_empty() {
                blocks.push(PageBlock {
                    sender: msg.sender.clone(),
                    timestamp: msg.timestamp,
                    from_owner,
                    is_system: msg.is_system,
                    is_edited: msg.is_edited,
                    body: BlockBody::Text(msg.content.clone()),
                });
            }

            let Some(renderer) = renderer else { continue };
            for att in msg.attachments() {
                let rendered = renderer.render(att);

                if !matches!(rendered.artifact, Artifact::Empty | Artifact::Placeholder(_)) {
                    attachment_docs.push(AttachmentDoc {
                        filename: att.filename.clone(),
                        kind: att.kind,
                        caption: caption_for(msg),
                        artifact: rendered.artifact.clone(),
                    });
                }

                blocks.push(PageBlock {
                    sender: msg.sender.clone(),
                    timestamp: msg.timestamp,
                    from_owner,
                    is_system: msg.is_system,
                    is_edited: msg.is_edited,
                    body: BlockBody::Attachment(rendered),
                });
            }
        }

        Report {
            blocks,
            attachment_docs,
            owner,
        }
    }
}

/// Picks the most frequent non-system sender as the device owner.
///
/// Ties go to the sender seen first, so the result is stable across runs.
fn detect_owner(messages: &[Message]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for msg in messages {
        if msg.is_system || msg.sender.is_empty() {
            continue;
        }
        let entry = counts.entry(msg.sender()).or_insert(0);
        if *entry == 0 {
            first_seen.push(msg.sender());
        }
        *entry += 1;
    }

    // max_by_key keeps the last maximal element, so iterating in reverse
    // order of first appearance lets ties land on the earliest sender.
    first_seen
        .iter()
        .rev()
        .max_by_key(|sender| counts.get(*sender).copied().unwrap_or(0))
        .map(|s| (*s).to_string())
}

/// Caption line for a per-attachment document.
fn caption_for(msg: &Message) -> String {
    let mut caption = String::new();
    if !msg.sender.is_empty() {
        caption.push_str(msg.sender());
    }
    if let Some(ts) = msg.timestamp {
        if !caption.is_empty() {
            caption.push_str(", ");
        }
        caption.push_str(&ts.format("%Y-%m-%d %H:%M").to_string());
    }
    if !msg.content.trim().is_empty() {
        if !caption.is_empty() {
            caption.push_str(" - ");
        }
        caption.push_str(msg.content.trim());
    }
    caption
}
