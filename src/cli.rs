//! Command-line interface definition using clap.
//!
//! This module defines [`Args`], the CLI argument structure, and its
//! conversion into a library [`ReportConfig`]. The library itself never
//! reads these; everything flows through the config value.

use std::time::Duration;

use clap::Parser;

use crate::config::ReportConfig;
use crate::locale::LOCALES;

/// Turn a WhatsApp chat export into a structured, renderable report.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatreport")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatreport \"WhatsApp Chat with Alice\"
    chatreport export_dir -o report_out
    chatreport _chat.txt --locale eu-dot-bracketed
    chatreport export_dir --transcribe-cmd whisper-cli --owner Alice
    chatreport export_dir --stats-only")]
pub struct Args {
    /// Extracted export directory, or a bare transcript .txt file
    pub input: String,

    /// Output directory for artifacts and the manifest
    #[arg(short, long, default_value = "report_out")]
    pub output: String,

    /// Pin the timestamp locale instead of auto-detecting
    #[arg(long, value_name = "ID", value_parser = locale_ids())]
    pub locale: Option<String>,

    /// Skip attachment resolution and rendering entirely
    #[arg(long)]
    pub no_attachments: bool,

    /// Keep attachment marker text in message bodies
    #[arg(long)]
    pub keep_markers: bool,

    /// External command for voice note transcription (gets the audio path
    /// as its argument, prints the transcript to stdout)
    #[arg(long, value_name = "CMD")]
    pub transcribe_cmd: Option<String>,

    /// Sender to tag as device owner (default: most frequent sender)
    #[arg(long, value_name = "NAME")]
    pub owner: Option<String>,

    /// Per-attachment rendering budget in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub budget: u64,

    /// Parse and print statistics only; write nothing
    #[arg(long)]
    pub stats_only: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Builds the library configuration from the parsed arguments.
    pub fn to_config(&self) -> ReportConfig {
        let mut config = ReportConfig::new()
            .with_include_attachments(!self.no_attachments)
            .with_strip_markers(!self.keep_markers)
            .with_attachment_budget(Duration::from_secs(self.budget));
        if let Some(id) = &self.locale {
            config = config.with_locale(id.clone());
        }
        if let Some(cmd) = &self.transcribe_cmd {
            config = config.with_transcribe_command(cmd.clone());
        }
        if let Some(owner) = &self.owner {
            config = config.with_device_owner(owner.clone());
        }
        config
    }
}

/// Valid values for `--locale`, straight from the locale table.
fn locale_ids() -> clap::builder::PossibleValuesParser {
    clap::builder::PossibleValuesParser::new(LOCALES.iter().map(|spec| spec.id))
}
