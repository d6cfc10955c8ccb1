//! Normalized message and attachment types.
//!
//! This module provides [`Message`], the sealed representation of one chat
//! entry, and [`AttachmentRef`], a by-name reference to a media file that
//! travelled alongside the transcript. The assembler produces these and no
//! later stage mutates them.
//!
//! # Overview
//!
//! A message consists of:
//! - **Required**: `sender` and `content`
//! - **Optional**: `timestamp`, attachment references, system/edited flags
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```
//! use chatreport::Message;
//!
//! let msg = Message::new("Alice", "Hello, world!");
//! assert_eq!(msg.sender(), "Alice");
//! assert_eq!(msg.content(), "Hello, world!");
//! ```
//!
//! ## Builder Pattern
//!
//! ```
//! use chatreport::{AttachmentRef, Message};
//! use chrono::Utc;
//!
//! let msg = Message::new("Bob", "Check this out!")
//!     .with_timestamp(Utc::now())
//!     .with_attachment(AttachmentRef::from_filename("IMG-20240101-WA0001.jpg"));
//!
//! assert!(msg.has_attachments());
//! ```

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The media category of an attachment, decided once from its filename.
///
/// Every downstream stage dispatches on this tag instead of re-inspecting
/// the filename, so the extension tables live in exactly one place
/// ([`AttachmentKind::from_filename`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Still image (jpg, png, gif, heic, ...).
    Image,
    /// Video clip, previewed as a frame strip.
    Video,
    /// Voice note or audio file, rendered as a transcript.
    Audio,
    /// WebP sticker, possibly animated.
    Sticker,
    /// vCard contact file.
    Contact,
    /// Office or text document.
    Document,
    /// Unrecognized extension; rendered as a named placeholder.
    Unknown,
}

impl AttachmentKind {
    /// Classifies a filename by extension.
    ///
    /// `.webp` files are stickers only when the file stem contains `STK` or
    /// `STICKER` (case-insensitive), matching the names WhatsApp gives
    /// exported sticker files; any other `.webp` is treated as an image.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatreport::AttachmentKind;
    ///
    /// assert_eq!(AttachmentKind::from_filename("photo.JPG"), AttachmentKind::Image);
    /// assert_eq!(AttachmentKind::from_filename("STK-20240101-WA0002.webp"), AttachmentKind::Sticker);
    /// assert_eq!(AttachmentKind::from_filename("diagram.webp"), AttachmentKind::Image);
    /// assert_eq!(AttachmentKind::from_filename("notes.pdf"), AttachmentKind::Document);
    /// ```
    pub fn from_filename(filename: &str) -> Self {
        let path = Path::new(filename);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "heic" | "heif" | "tiff" => {
                AttachmentKind::Image
            }
            "webp" => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_ascii_uppercase)
                    .unwrap_or_default();
                if stem.contains("STK") || stem.contains("STICKER") {
                    AttachmentKind::Sticker
                } else {
                    AttachmentKind::Image
                }
            }
            "mp4" | "mov" | "3gp" | "avi" | "mkv" | "webm" => AttachmentKind::Video,
            "opus" | "mp3" | "m4a" | "aac" | "ogg" | "wav" | "amr" => AttachmentKind::Audio,
            "vcf" => AttachmentKind::Contact,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "csv" => {
                AttachmentKind::Document
            }
            _ => AttachmentKind::Unknown,
        }
    }

    /// Returns a short lowercase label, used in logs and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Audio => "audio",
            AttachmentKind::Sticker => "sticker",
            AttachmentKind::Contact => "contact",
            AttachmentKind::Document => "document",
            AttachmentKind::Unknown => "file",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A by-name reference to an attachment mentioned in the transcript.
///
/// Export transcripts reference media by base filename only; resolution to
/// an actual file happens later against the export directory. The kind is
/// fixed at extraction time so ordering and dispatch never depend on
/// whether the file is actually present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Base filename exactly as the transcript mentioned it.
    pub filename: String,

    /// Media category derived from the filename.
    pub kind: AttachmentKind,
}

impl AttachmentRef {
    /// Creates a reference, classifying the filename in the process.
    pub fn from_filename(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let kind = AttachmentKind::from_filename(&filename);
        Self { filename, kind }
    }

    /// Creates a reference with an explicit kind.
    pub fn new(filename: impl Into<String>, kind: AttachmentKind) -> Self {
        Self {
            filename: filename.into(),
            kind,
        }
    }
}

/// A sealed chat message.
///
/// The assembler merges header and continuation lines into one of these and
/// extracts attachment references; after sealing, nothing mutates it.
///
/// # Fields
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | `sender` | `String` | Display name of the message author |
/// | `content` | `String` | Text content, newlines preserved |
/// | `timestamp` | `Option<DateTime<Utc>>` | When the message was sent |
/// | `attachments` | `Vec<AttachmentRef>` | Referenced media, in order of appearance |
/// | `is_system` | `bool` | Entry produced by the platform, not a participant |
/// | `is_edited` | `bool` | The platform marked this message as edited |
///
/// # Serialization
///
/// Implements `Serialize` and `Deserialize` with these behaviors:
/// - The timestamp is omitted from JSON when `None`
/// - Timestamps use RFC 3339 format
/// - Empty attachment lists and false flags are omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the message author.
    ///
    /// System entries use the empty string.
    pub sender: String,

    /// Text content of the message.
    ///
    /// May contain newlines for multiline messages. Attachment marker text
    /// has already been stripped when the configuration asks for it.
    pub content: String,

    /// When the message was sent.
    ///
    /// `None` when the header matched but its timestamp did not survive
    /// calendar validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Media referenced by this message, in order of appearance.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,

    /// `true` for platform notices (encryption banner, joins, leaves).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub is_system: bool,

    /// `true` when the platform marked this message as edited.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub is_edited: bool,
}

impl Message {
    /// Creates a new message with only sender and content.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatreport::Message;
    ///
    /// let msg = Message::new("Alice", "Hello!");
    /// assert_eq!(msg.sender(), "Alice");
    /// assert!(msg.timestamp().is_none());
    /// ```
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp: None,
            attachments: Vec::new(),
            is_system: false,
            is_edited: false,
        }
    }

    /// Creates a system entry (no sender).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: String::new(),
            content: content.into(),
            timestamp: None,
            attachments: Vec::new(),
            is_system: true,
            is_edited: false,
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Builder method to set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Builder method to append an attachment reference.
    #[must_use]
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builder method to mark the message as edited.
    #[must_use]
    pub fn mark_edited(mut self) -> Self {
        self.is_edited = true;
        self
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Returns the sender name.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the message content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the timestamp, if available.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Returns the attachment references in order of appearance.
    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    // =========================================================================
    // Utility methods
    // =========================================================================

    /// Returns `true` if this message references at least one attachment.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Returns `true` if this message's content is empty or whitespace-only.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new("", "")
    }
}
