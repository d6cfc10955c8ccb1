//! Configuration for report generation.
//!
//! This module provides a clean configuration struct for library usage,
//! without any CLI framework dependencies. Every knob is an explicit value
//! passed down the pipeline; nothing reads globals or environment state.
//!
//! # Example
//!
//! ```rust
//! use chatreport::config::ReportConfig;
//!
//! let config = ReportConfig::new()
//!     .with_locale("eu-dot-dash")
//!     .with_strip_markers(true)
//!     .with_device_owner("Alice");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::locale::LocaleSpec;

/// Configuration for turning an export into a report.
///
/// The defaults match what the typical run wants: auto-detected locale,
/// attachments rendered, marker text stripped out of message bodies, and
/// transcription off (it needs an external command).
///
/// # Example
///
/// ```rust
/// use chatreport::config::ReportConfig;
///
/// let config = ReportConfig::new().with_transcribe_command("whisper-cli");
/// assert!(config.transcribe_command.is_some());
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Fixed locale id, or `None` to auto-detect from the transcript.
    pub locale: Option<String>,

    /// Resolve and render attachments (default: true).
    ///
    /// When false, attachment references still appear in messages but no
    /// files are opened and no media is rendered.
    pub include_attachments: bool,

    /// Remove attachment marker text from message bodies (default: true).
    pub strip_markers: bool,

    /// External command that turns an audio file path (its one argument)
    /// into a transcript on stdout. `None` disables transcription; audio
    /// attachments then render as empty rather than failed.
    pub transcribe_command: Option<String>,

    /// Wall-clock budget for rendering a single attachment (default: 30s).
    ///
    /// An attachment that exceeds it becomes a placeholder; the run
    /// continues.
    #[serde(with = "duration_secs")]
    pub attachment_budget: Duration,

    /// Sender name to tag as the device owner, or `None` to pick the most
    /// frequent sender.
    pub device_owner: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locale: None,
            include_attachments: true,
            strip_markers: true,
            transcribe_command: None,
            attachment_budget: Duration::from_secs(30),
            device_owner: None,
        }
    }
}

impl ReportConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the locale instead of auto-detecting.
    #[must_use]
    pub fn with_locale(mut self, id: impl Into<String>) -> Self {
        self.locale = Some(id.into());
        self
    }

    /// Enables or disables attachment resolution and rendering.
    #[must_use]
    pub fn with_include_attachments(mut self, include: bool) -> Self {
        self.include_attachments = include;
        self
    }

    /// Sets whether marker text is stripped from message bodies.
    #[must_use]
    pub fn with_strip_markers(mut self, strip: bool) -> Self {
        self.strip_markers = strip;
        self
    }

    /// Sets the external transcription command, enabling transcription.
    #[must_use]
    pub fn with_transcribe_command(mut self, command: impl Into<String>) -> Self {
        self.transcribe_command = Some(command.into());
        self
    }

    /// Sets the per-attachment rendering budget.
    #[must_use]
    pub fn with_attachment_budget(mut self, budget: Duration) -> Self {
        self.attachment_budget = budget;
        self
    }

    /// Pins the device owner instead of picking the most frequent sender.
    #[must_use]
    pub fn with_device_owner(mut self, owner: impl Into<String>) -> Self {
        self.device_owner = Some(owner.into());
        self
    }

    /// Checks the configuration before any work starts.
    ///
    /// Rejects unknown locale ids and a zero attachment budget.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.locale {
            if LocaleSpec::by_id(id).is_none() {
                return Err(ReportError::invalid_config(format!(
                    "unknown locale id '{id}'"
                )));
            }
        }
        if self.attachment_budget.is_zero() {
            return Err(ReportError::invalid_config(
                "attachment budget must be positive",
            ));
        }
        Ok(())
    }

    /// Returns `true` when audio attachments should be transcribed.
    pub fn transcription_enabled(&self) -> bool {
        self.transcribe_command.is_some()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert!(config.locale.is_none());
        assert!(config.include_attachments);
        assert!(config.strip_markers);
        assert!(!config.transcription_enabled());
        assert_eq!(config.attachment_budget, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = ReportConfig::new()
            .with_locale("eu-dot-dash")
            .with_include_attachments(false)
            .with_strip_markers(false)
            .with_transcribe_command("whisper-cli")
            .with_attachment_budget(Duration::from_secs(5))
            .with_device_owner("Alice");

        assert_eq!(config.locale.as_deref(), Some("eu-dot-dash"));
        assert!(!config.include_attachments);
        assert!(!config.strip_markers);
        assert!(config.transcription_enabled());
        assert_eq!(config.attachment_budget, Duration::from_secs(5));
        assert_eq!(config.device_owner.as_deref(), Some("Alice"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_locale() {
        let config = ReportConfig::new().with_locale("klingon");
        let err = config.validate().unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = ReportConfig::new().with_attachment_budget(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ReportConfig::new().with_locale("us-bracketed");
        let json = serde_json::to_string(&config).unwrap();
        let back: ReportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.locale.as_deref(), Some("us-bracketed"));
        assert_eq!(back.attachment_budget, Duration::from_secs(30));
    }
}
