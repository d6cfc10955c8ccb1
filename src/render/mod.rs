//! Attachment rendering with total failure isolation.
//!
//! [`AttachmentRenderer`] turns attachment references into [`Artifact`]s.
//! Every render returns a value: a missing file, a corrupt image, a dead
//! ffmpeg or a blown time budget all come back as placeholder artifacts
//! carrying a [`FailureReason`], never as errors. One bad attachment can
//! therefore never abort a report.
//!
//! Rendered pixel data lives behind [`Arc`] so a report page and the
//! per-attachment documents can share it without a second decode.

pub mod media;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::Serialize;

use crate::archive::{AttachmentResolver, ExportArchive, Resolution};
use crate::config::ReportConfig;
use crate::message::{AttachmentKind, AttachmentRef};
use media::{
    CommandTranscriber, FfmpegFrameExtractor, FrameExtractor, ImageResizer, RasterResizer,
    Transcriber, decode_sticker_frames,
};

/// Longest edge for rendered still images.
pub const IMAGE_MAX_EDGE: u32 = 1280;

/// Longest edge for video preview and sticker frames.
pub const FRAME_MAX_EDGE: u32 = 480;

/// A video preview is always exactly this many frames.
pub const VIDEO_FRAME_COUNT: usize = 4;

/// Upper bound on sticker animation frames kept.
pub const STICKER_MAX_FRAMES: usize = 9;

/// Why an attachment rendered as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The file is not in the export.
    SourceMissing,
    /// The file is unreadable or could not be decoded. Also covers
    /// ffmpeg failures and blown render budgets on visual media.
    DecodeError(String),
    /// Contact card, document, or unrecognized kind; no binary
    /// processing is attempted for these.
    UnsupportedFormat,
    /// Transcription was requested but the backend failed or timed out.
    TranscriptionUnavailable(String),
}

impl FailureReason {
    /// Short label for logs and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::SourceMissing => "source_missing",
            FailureReason::DecodeError(_) => "decode_error",
            FailureReason::UnsupportedFormat => "unsupported_format",
            FailureReason::TranscriptionUnavailable(_) => "transcription_unavailable",
        }
    }
}

/// What rendering an attachment produced.
///
/// Pixel artifacts are reference-counted; cloning an artifact never clones
/// image data.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// A single decoded, size-bounded image.
    Image(Arc<DynamicImage>),
    /// An ordered strip of frames (video preview, sticker animation).
    FrameGrid(Vec<Arc<DynamicImage>>),
    /// Text standing in for the media (audio transcript).
    Transcript(String),
    /// Nothing to show (transcription disabled, silent voice notes).
    Empty,
    /// Rendering failed; the report shows a named placeholder.
    Placeholder(FailureReason),
}

impl Artifact {
    /// Returns `true` for placeholder artifacts.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Artifact::Placeholder(_))
    }
}

/// One rendered attachment: the reference, its artifact, and where the
/// source file was found (if it was).
#[derive(Debug, Clone)]
pub struct RenderedAttachment {
    /// The reference this was rendered from.
    pub reference: AttachmentRef,
    /// Resolved source path, when resolution succeeded.
    pub source: Option<PathBuf>,
    /// The rendering result.
    pub artifact: Artifact,
    /// Wall-clock time the render took.
    pub elapsed: Duration,
}

impl RenderedAttachment {
    /// Returns the attachment kind.
    pub fn kind(&self) -> AttachmentKind {
        self.reference.kind
    }
}

/// Renders attachments for one export.
///
/// Backends are pluggable: tests swap in deterministic extractors and
/// transcribers, production uses ffmpeg and the configured transcription
/// command.
pub struct AttachmentRenderer<'a> {
    resolver: AttachmentResolver<'a>,
    resizer: Box<dyn ImageResizer>,
    extractor: Box<dyn FrameExtractor>,
    transcriber: Option<Box<dyn Transcriber>>,
    budget: Duration,
}

impl<'a> AttachmentRenderer<'a> {
    /// Creates a renderer with the default backends for `config`.
    pub fn new(archive: &'a ExportArchive, config: &ReportConfig) -> Self {
        let transcriber: Option<Box<dyn Transcriber>> = config.transcribe_command.as_ref().map(
            |cmd| {
                Box::new(CommandTranscriber::new(cmd).with_timeout(config.attachment_budget))
                    as Box<dyn Transcriber>
            },
        );
        Self {
            resolver: AttachmentResolver::new(archive),
            resizer: Box::new(RasterResizer),
            extractor: Box::new(
                FfmpegFrameExtractor::default().with_timeout(config.attachment_budget),
            ),
            transcriber,
            budget: config.attachment_budget,
        }
    }

    /// Replaces the frame extractor backend.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn FrameExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the transcriber backend.
    #[must_use]
    pub fn with_transcriber(mut self, transcriber: Option<Box<dyn Transcriber>>) -> Self {
        self.transcriber = transcriber;
        self
    }

    /// Renders one attachment reference.
    ///
    /// Never fails; every problem becomes a placeholder artifact.
    pub fn render(&self, att: &AttachmentRef) -> RenderedAttachment {
        let start = Instant::now();

        let path = match self.resolver.resolve(att) {
            Resolution::Found(path) => path,
            Resolution::Missing => {
                return self.finish(
                    att,
                    None,
                    Artifact::Placeholder(FailureReason::SourceMissing),
                    start,
                );
            }
            Resolution::Unreadable { path, reason } => {
                tracing::warn!(file = %att.filename, %reason, "unreadable attachment");
                return self.finish(
                    att,
                    Some(path),
                    Artifact::Placeholder(FailureReason::DecodeError(reason)),
                    start,
                );
            }
        };

        let artifact = match att.kind {
            AttachmentKind::Image => match image::open(&path) {
                Ok(img) => {
                    Artifact::Image(Arc::new(self.resizer.fit(img, IMAGE_MAX_EDGE)))
                }
                Err(err) => {
                    tracing::warn!(file = %att.filename, error = %err, "image decode failed");
                    Artifact::Placeholder(FailureReason::DecodeError(err.to_string()))
                }
            },

            AttachmentKind::Sticker => match decode_sticker_frames(&path, STICKER_MAX_FRAMES) {
                Ok(frames) => Artifact::FrameGrid(
                    frames
                        .into_iter()
                        .map(|f| Arc::new(self.resizer.fit(f, FRAME_MAX_EDGE)))
                        .collect(),
                ),
                Err(err) => {
                    tracing::warn!(file = %att.filename, error = %err, "sticker decode failed");
                    Artifact::Placeholder(FailureReason::DecodeError(err))
                }
            },

            AttachmentKind::Video => match self.extractor.extract_frames(&path, VIDEO_FRAME_COUNT) {
                Ok(frames) => {
                    debug_assert_eq!(frames.len(), VIDEO_FRAME_COUNT);
                    Artifact::FrameGrid(
                        frames
                            .into_iter()
                            .map(|f| Arc::new(self.resizer.fit(f, FRAME_MAX_EDGE)))
                            .collect(),
                    )
                }
                Err(err) => {
                    tracing::warn!(file = %att.filename, error = %err, "video preview failed");
                    Artifact::Placeholder(FailureReason::DecodeError(err))
                }
            },

            AttachmentKind::Audio => match &self.transcriber {
                None => Artifact::Empty,
                Some(transcriber) => match transcriber.transcribe(&path) {
                    Ok(text) if text.trim().is_empty() => Artifact::Empty,
                    Ok(text) => Artifact::Transcript(text),
                    Err(err) => {
                        tracing::warn!(file = %att.filename, error = %err, "transcription failed");
                        Artifact::Placeholder(FailureReason::TranscriptionUnavailable(err))
                    }
                },
            },

            // no binary processing for these; the placeholder block keeps
            // the filename and kind visible in the report
            AttachmentKind::Contact | AttachmentKind::Document | AttachmentKind::Unknown => {
                Artifact::Placeholder(FailureReason::UnsupportedFormat)
            }
        };

        self.finish(att, Some(path), artifact, start)
    }

    /// Applies the time budget and stamps the elapsed time.
    fn finish(
        &self,
        att: &AttachmentRef,
        source: Option<PathBuf>,
        artifact: Artifact,
        start: Instant,
    ) -> RenderedAttachment {
        let elapsed = start.elapsed();
        let artifact = if elapsed > self.budget && !artifact.is_placeholder() {
            tracing::warn!(
                file = %att.filename,
                elapsed_ms = elapsed.as_millis() as u64,
                "attachment exceeded render budget"
            );
            let reason = match att.kind {
                AttachmentKind::Audio => {
                    FailureReason::TranscriptionUnavailable("render budget exceeded".to_string())
                }
                _ => FailureReason::DecodeError("render budget exceeded".to_string()),
            };
            Artifact::Placeholder(reason)
        } else {
            artifact
        };
        RenderedAttachment {
            reference: att.clone(),
            source,
            artifact,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct FakeExtractor {
        frames: usize,
        delay: Duration,
    }

    impl FrameExtractor for FakeExtractor {
        fn extract_frames(&self, _path: &Path, count: usize) -> Result<Vec<DynamicImage>, String> {
            std::thread::sleep(self.delay);
            if self.frames == 0 {
                return Err("no decodable frames".to_string());
            }
            Ok((0..count)
                .map(|_| DynamicImage::ImageRgba8(RgbaImage::new(8, 8)))
                .collect())
        }
    }

    struct FakeTranscriber(Result<String, String>);

    impl Transcriber for FakeTranscriber {
        fn transcribe(&self, _path: &Path) -> Result<String, String> {
            self.0.clone()
        }
    }

    fn export_with(files: &[(&str, &[u8])]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_chat.txt"), b"x").unwrap();
        for (name, bytes) in files {
            fs::write(tmp.path().join(name), bytes).unwrap();
        }
        tmp
    }

    fn png_bytes() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        let img = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_image_renders() {
        let png = png_bytes();
        let tmp = export_with(&[("IMG-20240101-WA0001.png", &png)]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("IMG-20240101-WA0001.png"));
        assert!(matches!(out.artifact, Artifact::Image(_)));
        assert!(out.source.is_some());
    }

    #[test]
    fn test_missing_becomes_placeholder() {
        let tmp = export_with(&[]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("IMG-20240101-WA0404.jpg"));
        match out.artifact {
            Artifact::Placeholder(FailureReason::SourceMissing) => {}
            other => panic!("expected missing placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_image_becomes_placeholder() {
        // valid PNG magic, garbage body: passes the resolver sniff,
        // fails the decoder
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 32]);
        let tmp = export_with(&[("IMG-20240101-WA0002.png", &bytes)]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("IMG-20240101-WA0002.png"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::DecodeError(_))
        ));
    }

    #[test]
    fn test_video_is_exactly_four_frames() {
        let tmp = export_with(&[("VID-20240101-WA0001.mp4", b"fake")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new()).with_extractor(
            Box::new(FakeExtractor {
                frames: 4,
                delay: Duration::ZERO,
            }),
        );

        let out = renderer.render(&AttachmentRef::from_filename("VID-20240101-WA0001.mp4"));
        match out.artifact {
            Artifact::FrameGrid(frames) => assert_eq!(frames.len(), VIDEO_FRAME_COUNT),
            other => panic!("expected frame grid, got {other:?}"),
        }
    }

    #[test]
    fn test_video_failure_becomes_placeholder() {
        let tmp = export_with(&[("VID-20240101-WA0002.mp4", b"fake")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new()).with_extractor(
            Box::new(FakeExtractor {
                frames: 0,
                delay: Duration::ZERO,
            }),
        );

        let out = renderer.render(&AttachmentRef::from_filename("VID-20240101-WA0002.mp4"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::DecodeError(_))
        ));
    }

    #[test]
    fn test_audio_without_transcriber_is_empty() {
        let tmp = export_with(&[("PTT-20240101-WA0001.opus", b"fake audio")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("PTT-20240101-WA0001.opus"));
        assert!(matches!(out.artifact, Artifact::Empty));
    }

    #[test]
    fn test_audio_transcription() {
        let tmp = export_with(&[("PTT-20240101-WA0002.opus", b"fake audio")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new())
            .with_transcriber(Some(Box::new(FakeTranscriber(Ok("hello world".into())))));

        let out = renderer.render(&AttachmentRef::from_filename("PTT-20240101-WA0002.opus"));
        match out.artifact {
            Artifact::Transcript(text) => assert_eq!(text, "hello world"),
            other => panic!("expected transcript, got {other:?}"),
        }
    }

    #[test]
    fn test_silent_audio_is_empty() {
        let tmp = export_with(&[("PTT-20240101-WA0003.opus", b"fake audio")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new())
            .with_transcriber(Some(Box::new(FakeTranscriber(Ok("   ".into())))));

        let out = renderer.render(&AttachmentRef::from_filename("PTT-20240101-WA0003.opus"));
        assert!(matches!(out.artifact, Artifact::Empty));
    }

    #[test]
    fn test_failed_transcription_is_placeholder() {
        let tmp = export_with(&[("PTT-20240101-WA0004.opus", b"fake audio")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new())
            .with_transcriber(Some(Box::new(FakeTranscriber(Err("model crashed".into())))));

        let out = renderer.render(&AttachmentRef::from_filename("PTT-20240101-WA0004.opus"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::TranscriptionUnavailable(_))
        ));
    }

    #[test]
    fn test_document_is_unsupported_placeholder() {
        let tmp = export_with(&[("report.pdf", b"%PDF-1.4")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("report.pdf"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::UnsupportedFormat)
        ));
        // the reference keeps filename and kind for the placeholder block
        assert_eq!(out.reference.filename, "report.pdf");
        assert_eq!(out.kind(), AttachmentKind::Document);
    }

    #[test]
    fn test_budget_exceeded_becomes_timeout() {
        let tmp = export_with(&[("VID-20240101-WA0003.mp4", b"fake")]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let config = ReportConfig::new().with_attachment_budget(Duration::from_millis(1));
        let renderer = AttachmentRenderer::new(&archive, &config).with_extractor(Box::new(
            FakeExtractor {
                frames: 4,
                delay: Duration::from_millis(30),
            },
        ));

        let out = renderer.render(&AttachmentRef::from_filename("VID-20240101-WA0003.mp4"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::DecodeError(_))
        ));
    }

    #[test]
    fn test_contact_card_is_unsupported_placeholder() {
        let vcf = b"BEGIN:VCARD\nFN:Jane Doe\nTEL:+1 555 0101\nEND:VCARD\n";
        let tmp = export_with(&[("Jane Doe.vcf", vcf)]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("Jane Doe.vcf"));
        assert!(matches!(
            out.artifact,
            Artifact::Placeholder(FailureReason::UnsupportedFormat)
        ));
        assert_eq!(out.kind(), AttachmentKind::Contact);
    }

    #[test]
    fn test_artifact_sharing_is_cheap() {
        let png = png_bytes();
        let tmp = export_with(&[("IMG-20240101-WA0005.png", &png)]);
        let archive = ExportArchive::open(tmp.path()).unwrap();
        let renderer = AttachmentRenderer::new(&archive, &ReportConfig::new());

        let out = renderer.render(&AttachmentRef::from_filename("IMG-20240101-WA0005.png"));
        if let Artifact::Image(img) = &out.artifact {
            let clone = out.artifact.clone();
            if let Artifact::Image(img2) = &clone {
                assert!(Arc::ptr_eq(img, img2));
            }
        } else {
            panic!("expected image");
        }
    }
}
