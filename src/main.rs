//! # chatreport CLI
//!
//! Command-line interface for the chatreport library.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatreport::ReportError;
use chatreport::archive::ExportArchive;
use chatreport::cli::Args;
use chatreport::parse::parse_transcript;
use chatreport::render::AttachmentRenderer;
use chatreport::report::ReportBuilder;
use chatreport::stats::ChatStats;

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), ReportError> {
    let total_start = Instant::now();
    let args = Args::parse();

    init_tracing(args.verbose);

    let config = args.to_config();
    config.validate()?;

    println!("📄 chatreport v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:   {}", args.input);
    if !args.stats_only {
        println!("💾 Output:  {}", args.output);
    }
    if let Some(locale) = &args.locale {
        println!("🌍 Locale:  {} (pinned)", locale);
    }
    if args.no_attachments {
        println!("⏭️  Attachments: skipped");
    }
    println!();

    // Step 1: Open the export
    let archive = ExportArchive::open(Path::new(&args.input))?;
    println!(
        "📦 Export:  {} files, transcript {}",
        archive.file_count(),
        archive.chat_file().display()
    );

    // Step 2: Parse the transcript
    let parse_start = Instant::now();
    let transcript = archive.transcript()?;
    let (messages, locale) = parse_transcript(&transcript, &config)?;
    println!(
        "💬 Parsed:  {} messages, locale {} ({:.2}s)",
        messages.len(),
        locale.id,
        parse_start.elapsed().as_secs_f64()
    );

    // Step 3: Render and assemble
    let build_start = Instant::now();
    let renderer;
    let renderer_ref = if config.include_attachments && !args.stats_only {
        renderer = AttachmentRenderer::new(&archive, &config);
        Some(&renderer)
    } else {
        None
    };
    let report = ReportBuilder::new(&config).build(&messages, renderer_ref);
    println!(
        "🧱 Blocks:  {} page blocks, {} attachment docs ({:.2}s)",
        report.blocks.len(),
        report.attachment_docs.len(),
        build_start.elapsed().as_secs_f64()
    );
    if report.failed_attachments() > 0 {
        println!("⚠️  Failed attachments: {}", report.failed_attachments());
    }

    // Step 4: Statistics
    let stats = ChatStats::collect(&messages, &report);
    println!();
    println!("{stats}");
    println!();

    // Step 5: Write artifacts and manifest
    if !args.stats_only {
        let write_start = Instant::now();
        let out_dir = Path::new(&args.output);
        let manifest = report.write_artifacts(out_dir)?;
        let manifest_path = out_dir.join("report.json");
        std::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        println!(
            "✅ Wrote {} blocks to {} ({:.2}s)",
            manifest.block_count,
            manifest_path.display(),
            write_start.elapsed().as_secs_f64()
        );
    }

    println!("⏱️  Total: {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatreport={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
