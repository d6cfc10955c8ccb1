//! # Chatreport
//!
//! A Rust library for turning WhatsApp chat exports into structured,
//! renderable reports: sealed messages, resolved media, rendered artifacts,
//! and a page-ordered block list a document backend can lay out directly.
//!
//! ## Overview
//!
//! An extracted export (transcript plus the media files next to it) goes
//! through five stages:
//!
//! - **Archive** — locate the transcript, index every file once
//! - **Parse** — classify lines, assemble multiline messages, extract
//!   attachment references
//! - **Resolve** — find each referenced file, tolerant of case and Unicode
//!   normalization differences
//! - **Render** — decode images, sample sticker frames, grab video preview
//!   frames, transcribe voice notes; every failure becomes a placeholder
//! - **Report** — interleave text and attachment blocks in transcript
//!   order, plus standalone per-attachment documents sharing the same
//!   rendered artifacts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatreport::archive::ExportArchive;
//! use chatreport::config::ReportConfig;
//! use chatreport::parse::parse_transcript;
//! use chatreport::render::AttachmentRenderer;
//! use chatreport::report::ReportBuilder;
//!
//! fn main() -> chatreport::Result<()> {
//!     let config = ReportConfig::new();
//!     let archive = ExportArchive::open("my chat export".as_ref())?;
//!     let (messages, locale) = parse_transcript(&archive.transcript()?, &config)?;
//!     println!("{} messages, locale {}", messages.len(), locale.id);
//!
//!     let renderer = AttachmentRenderer::new(&archive, &config);
//!     let report = ReportBuilder::new(&config).build(&messages, Some(&renderer));
//!     report.write_artifacts("out".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`archive`] — export access ([`ExportArchive`](archive::ExportArchive),
//!   [`AttachmentResolver`](archive::AttachmentResolver))
//! - [`locale`] — timestamp conventions as a data table
//!   ([`LocaleSpec`](locale::LocaleSpec), [`Locale`](locale::Locale))
//! - [`parse`] — line classification and message assembly
//! - [`message`] — [`Message`], [`AttachmentRef`], [`AttachmentKind`]
//! - [`render`] — attachment rendering with failure isolation
//! - [`report`] — page blocks, per-attachment docs, manifest output
//! - [`stats`] — per-run statistics ([`ChatStats`](stats::ChatStats))
//! - [`config`] — [`ReportConfig`](config::ReportConfig)
//! - [`error`] — unified error types ([`ReportError`], [`Result`])
//! - [`prelude`] — convenient re-exports

pub mod archive;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod locale;
pub mod message;
pub mod parse;
pub mod render;
pub mod report;
pub mod stats;

// Re-export the main types at the crate root for convenience
pub use error::{ReportError, Result};
pub use message::{AttachmentKind, AttachmentRef, Message};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatreport::prelude::*;
/// ```
pub mod prelude {
    pub use crate::archive::{AttachmentResolver, ExportArchive, Resolution};
    pub use crate::config::ReportConfig;
    pub use crate::error::{ReportError, Result};
    pub use crate::locale::{Locale, LocaleSpec};
    pub use crate::message::{AttachmentKind, AttachmentRef, Message};
    pub use crate::parse::parse_transcript;
    pub use crate::render::{Artifact, AttachmentRenderer, FailureReason, RenderedAttachment};
    pub use crate::report::{Report, ReportBuilder};
    pub use crate::stats::ChatStats;
}
