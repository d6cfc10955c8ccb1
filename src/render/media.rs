//! Media backends: resizing, frame extraction, transcription.
//!
//! The renderer dispatches through the traits in this module so tests can
//! substitute deterministic backends and deployments without ffmpeg or a
//! speech-to-text tool degrade to placeholders instead of failing. Backend
//! errors are plain strings; they only ever end up inside a placeholder.

use std::fs;
use std::io::{self, BufReader};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage};

/// How often a running subprocess is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Fallback deadline when no budget was plumbed in.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Runs a command to completion under a wall-clock deadline.
///
/// The child is killed once the deadline passes; expiry surfaces as an
/// [`io::ErrorKind::TimedOut`] error.
fn run_with_deadline(cmd: &mut Command, deadline: Duration) -> io::Result<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let start = Instant::now();
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output();
        }
        if start.elapsed() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "subprocess deadline exceeded",
            ));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Aspect-preserving downscaling.
pub trait ImageResizer {
    /// Fits `img` inside a `max_edge` square, never upscaling.
    fn fit(&self, img: DynamicImage, max_edge: u32) -> DynamicImage;
}

/// Default resizer backed by `image`'s thumbnail filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterResizer;

impl ImageResizer for RasterResizer {
    fn fit(&self, img: DynamicImage, max_edge: u32) -> DynamicImage {
        if img.width() <= max_edge && img.height() <= max_edge {
            img
        } else {
            img.thumbnail(max_edge, max_edge)
        }
    }
}

/// Pulls preview frames out of a video file.
pub trait FrameExtractor {
    /// Returns exactly `count` frames, evenly spread over the duration.
    ///
    /// Implementations may repeat the last decodable frame to reach the
    /// count; returning fewer than `count` frames is an error.
    fn extract_frames(&self, path: &Path, count: usize) -> Result<Vec<DynamicImage>, String>;
}

/// Frame extraction via the `ffmpeg` and `ffprobe` binaries.
///
/// Frames are grabbed at 0%, 33%, 66% and 100% of the probed duration
/// (clamped away from the very end, where many containers have no
/// seekable frame). When the duration cannot be probed, the first frames
/// of the stream are used instead.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            timeout: DEFAULT_DEADLINE,
        }
    }
}

impl FfmpegFrameExtractor {
    /// Creates an extractor with explicit binary names or paths.
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: DEFAULT_DEADLINE,
        }
    }

    /// Sets the wall-clock budget for one whole extraction, probe included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time left from `start`, or `None` once the budget is spent.
    fn remaining(&self, start: Instant) -> Option<Duration> {
        let left = self.timeout.checked_sub(start.elapsed())?;
        (!left.is_zero()).then_some(left)
    }

    /// Probes the container duration in seconds.
    fn probe_duration(&self, path: &Path, deadline: Duration) -> Option<f64> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path);
        let output = run_with_deadline(&mut cmd, deadline).ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }

    fn grab_frame(
        &self,
        path: &Path,
        offset: f64,
        out: &Path,
        deadline: Duration,
    ) -> Result<(), String> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-ss", &format!("{offset:.3}")])
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-y"])
            .arg(out);
        let output = run_with_deadline(&mut cmd, deadline)
            .map_err(|e| format!("failed to run {}: {e}", self.ffmpeg))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.ffmpeg, output.status))
        }
    }
}

impl FrameExtractor for FfmpegFrameExtractor {
    fn extract_frames(&self, path: &Path, count: usize) -> Result<Vec<DynamicImage>, String> {
        let scratch = tempfile::tempdir().map_err(|e| format!("scratch dir: {e}"))?;
        let start = Instant::now();

        let duration = self
            .remaining(start)
            .and_then(|left| self.probe_duration(path, left));
        let offsets: Vec<f64> = match duration {
            Some(duration) if duration > 0.0 => (0..count)
                .map(|i| {
                    let fraction = i as f64 / (count.max(2) - 1) as f64;
                    (fraction * duration).min((duration - 0.1).max(0.0))
                })
                .collect(),
            _ => vec![0.0; count],
        };

        let mut frames = Vec::with_capacity(count);
        for (i, &offset) in offsets.iter().enumerate() {
            let Some(left) = self.remaining(start) else {
                // out of budget; pad-by-last below covers a partial grab
                break;
            };
            let out = scratch.path().join(format!("frame{i}.png"));
            if let Err(err) = self.grab_frame(path, offset, &out, left) {
                tracing::debug!(offset, error = %err, "frame grab failed");
                continue;
            }
            match image::open(&out) {
                Ok(img) => frames.push(img),
                Err(err) => tracing::debug!(offset, error = %err, "frame decode failed"),
            }
        }

        if frames.is_empty() {
            return Err("no decodable frames".to_string());
        }
        while frames.len() < count {
            if let Some(last) = frames.last().cloned() {
                frames.push(last);
            }
        }
        frames.truncate(count);
        Ok(frames)
    }
}

/// Turns an audio file into text.
pub trait Transcriber {
    /// Returns the transcript; whitespace-only output means silence.
    fn transcribe(&self, path: &Path) -> Result<String, String>;
}

/// Transcription via an external command.
///
/// The command is invoked with the audio file path as its single argument
/// and must print the transcript to stdout.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    command: String,
    timeout: Duration,
}

impl CommandTranscriber {
    /// Creates a transcriber around an external command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_DEADLINE,
        }
    }

    /// Sets the wall-clock budget for one transcription call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, path: &Path) -> Result<String, String> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(path);
        let output = run_with_deadline(&mut cmd, self.timeout)
            .map_err(|e| format!("failed to run {}: {e}", self.command))?;
        if !output.status.success() {
            return Err(format!("{} exited with {}", self.command, output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Decodes sticker frames from a WebP file.
///
/// Animated stickers are sampled evenly down to `max_frames`; static ones
/// yield a single frame.
pub fn decode_sticker_frames(path: &Path, max_frames: usize) -> Result<Vec<DynamicImage>, String> {
    let file = fs::File::open(path).map_err(|e| e.to_string())?;
    let decoder = WebPDecoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;

    if decoder.has_animation() {
        let frames: Vec<DynamicImage> = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
            .collect();
        if frames.is_empty() {
            return Err("animated sticker with no frames".to_string());
        }
        Ok(sample_evenly(frames, max_frames))
    } else {
        let img = DynamicImage::from_decoder(decoder).map_err(|e| e.to_string())?;
        Ok(vec![img])
    }
}

/// Keeps at most `max` items, evenly spread, always including the first.
fn sample_evenly<T>(items: Vec<T>, max: usize) -> Vec<T> {
    let len = items.len();
    if len <= max || max == 0 {
        return items;
    }
    let mut picked = Vec::with_capacity(max);
    for (i, item) in items.into_iter().enumerate() {
        // index i is selected when it is the first to reach its bucket
        if i * max / len > (i.saturating_sub(1)) * max / len || i == 0 {
            picked.push(item);
        }
    }
    picked.truncate(max);
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::TempDir;

    #[test]
    fn test_resizer_downscales() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2000, 1000));
        let out = RasterResizer.fit(img, 500);
        assert!(out.width() <= 500 && out.height() <= 500);
        // aspect preserved
        assert_eq!(out.width(), 500);
        assert_eq!(out.height(), 250);
    }

    #[test]
    fn test_resizer_never_upscales() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 50));
        let out = RasterResizer.fit(img, 500);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_sample_evenly() {
        let items: Vec<usize> = (0..20).collect();
        let picked = sample_evenly(items, 9);
        assert_eq!(picked.len(), 9);
        assert_eq!(picked[0], 0);

        let few: Vec<usize> = (0..3).collect();
        assert_eq!(sample_evenly(few, 9).len(), 3);
    }

    #[test]
    fn test_static_sticker_single_frame() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("STK-20240101-WA0001.webp");
        let img = DynamicImage::ImageRgba8(RgbaImage::new(64, 64));
        img.save(&path).unwrap();

        let frames = decode_sticker_frames(&path, 9).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_sticker_decode_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("STK-20240101-WA0002.webp");
        fs::write(&path, b"garbage").unwrap();
        assert!(decode_sticker_frames(&path, 9).is_err());
    }

    #[test]
    fn test_missing_ffmpeg_is_an_error() {
        let extractor = FfmpegFrameExtractor::new("definitely-not-ffmpeg", "definitely-not-ffprobe");
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("VID-20240101-WA0001.mp4");
        fs::write(&path, b"not a video").unwrap();
        assert!(extractor.extract_frames(&path, 4).is_err());
    }

    #[test]
    fn test_deadline_kills_hung_subprocess() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_with_deadline(&mut cmd, Duration::from_millis(50)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_deadline_passes_through_fast_exit() {
        let mut cmd = Command::new("echo");
        cmd.arg("ok");
        let out = run_with_deadline(&mut cmd, Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn test_transcriber_deadline_maps_to_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("hang.sh");
        fs::write(&script, "#!/bin/sh\nsleep 60\n").unwrap();
        let mut perms = fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).unwrap();

        let audio = tmp.path().join("PTT-20240101-WA0001.opus");
        fs::write(&audio, b"x").unwrap();

        let transcriber = CommandTranscriber::new(script.to_string_lossy().into_owned())
            .with_timeout(Duration::from_millis(50));
        let err = transcriber.transcribe(&audio).unwrap_err();
        assert!(err.contains("deadline"), "unexpected error: {err}");
    }
}
