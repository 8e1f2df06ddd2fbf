//! CLI entry point for `mailrepack`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use mailrepack::archive::mbox::MboxSinkFactory;
use mailrepack::archive::memory::MemorySinkFactory;
use mailrepack::archive::SinkFactory;
use mailrepack::config::Config;
use mailrepack::fallback::{self, FallbackReport};
use mailrepack::loader::{self, LoaderOptions};
use mailrepack::package::{self, PackageReport, PackagingMode, RunContext};
use mailrepack::report::{self, RunSummary};

/// Repackage exported email metadata into MBOX archives.
#[derive(Parser)]
#[command(name = "mailrepack", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding one subdirectory of metadata files per account
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "metadata",
        env = "MAILREPACK_METADATA_DIR"
    )]
    metadata_dir: PathBuf,

    /// Directory archives are written to
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "output",
        env = "MAILREPACK_OUTPUT_DIR"
    )]
    output_dir: PathBuf,

    /// Archive container format
    #[arg(long, value_enum, default_value_t = ArchiveFormat::Mbox)]
    format: ArchiveFormat,

    /// Write at most N messages in total (0 = no limit)
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Accepted for compatibility; attachments are only ever recorded as a count
    #[arg(long)]
    skip_attachments: bool,

    /// One archive for all accounts (overrides the other modes)
    #[arg(long)]
    single: bool,

    /// One archive per message (default)
    #[arg(long)]
    per_message: bool,

    /// One archive per account and folder (overrides --per-account)
    #[arg(long)]
    per_folder: bool,

    /// One archive per account
    #[arg(long)]
    per_account: bool,

    /// Build archives in memory only; just the run summary is written
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 2 when only the fallback report could be written
    #[arg(long)]
    fail_on_fallback: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ArchiveFormat {
    /// mboxrd files, folder path in an `X-Folder` header
    Mbox,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = mailrepack::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_repack(&cli, &config),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailrepack::config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailrepack.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<ExitCode> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailrepack", &mut std::io::stdout());
    Ok(ExitCode::SUCCESS)
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<ExitCode> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(ExitCode::SUCCESS)
}

/// Load metadata and package it.
///
/// A missing metadata directory or one without accounts is an error (exit
/// status 1). A packaging failure that prevents any archive from being
/// created writes the fallback report and still succeeds unless
/// `--fail-on-fallback` is given.
fn cmd_repack(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    let mode = PackagingMode::from_flags(
        cli.single,
        cli.per_message,
        cli.per_folder,
        cli.per_account,
    )
    .or(config.packaging.default_mode)
    .unwrap_or_default();
    let limit = cli.limit.or(config.packaging.limit).filter(|&n| n > 0);
    if cli.skip_attachments {
        tracing::debug!(
            "--skip-attachments has no effect; attachments are recorded as a count only"
        );
    }

    let options = LoaderOptions::from(config.loader.clone());
    let batches = match loader::load_batches(&cli.metadata_dir, &options) {
        Ok(batches) => batches,
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Cannot load metadata");
            eprintln!("  {e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    let records: u64 = batches.iter().map(|b| b.records.len() as u64).sum();
    tracing::info!(
        accounts = batches.len(),
        records,
        mode = %mode,
        limit = ?limit,
        "Starting repack"
    );

    let mbox_factory = MboxSinkFactory;
    let memory_factory = MemorySinkFactory::new();
    let factory: &dyn SinkFactory = match (cli.dry_run, cli.format) {
        (true, _) => &memory_factory,
        (false, ArchiveFormat::Mbox) => &mbox_factory,
    };

    let pb = ProgressBar::new(package::eligible_records(&batches, limit));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Packaging [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    let tick = |written: u64| pb.set_position(written);
    let ctx = RunContext::new(factory, &cli.output_dir, limit).with_progress(&tick);

    let start = Instant::now();
    let result = package::package(mode, &batches, &ctx);
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            let summary = RunSummary {
                generated_at: chrono::Utc::now().to_rfc3339(),
                metadata_dir: &cli.metadata_dir,
                output_dir: &cli.output_dir,
                accounts: batches.len(),
                records,
                dry_run: cli.dry_run,
                report: &report,
            };
            let summary_path =
                report::write_summary(&cli.output_dir, &summary, chrono::Utc::now())?;
            print_report(&report, &cli.output_dir, &summary_path, start.elapsed(), cli.dry_run);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, mode = %mode, "Packaging failed");
            let path = fallback::write_report(&cli.output_dir, &FallbackReport::new(mode, &e))?;
            eprintln!("  Packaging failed: {e}");
            eprintln!("  Fallback report written to {}", path.display());
            if cli.fail_on_fallback {
                Ok(ExitCode::from(2))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Print a human-readable run summary.
fn print_report(
    report: &PackageReport,
    output_dir: &Path,
    summary_path: &Path,
    elapsed: std::time::Duration,
    dry_run: bool,
) {
    use humansize::{format_size, BINARY};

    let containers = report.containers();
    let bytes: u64 = containers
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    println!();
    println!("  Repack complete{}:", if dry_run { " (dry run)" } else { "" });
    println!("  {:<25} {}", "Mode", report.mode);
    if let Some(limit) = report.limit {
        println!("  {:<25} {}", "Limit", limit);
    }
    println!("  {:<25} {}", "Messages written", report.total_written);
    println!("  {:<25} {}", "Containers", containers.len());
    if report.duplicates_skipped > 0 {
        println!("  {:<25} {}", "Duplicates skipped", report.duplicates_skipped);
    }
    if report.failed_units() > 0 || report.failed_records > 0 {
        println!(
            "  {:<25} {} unit(s), {} record(s)",
            "Failures",
            report.failed_units(),
            report.failed_records
        );
    }
    if !dry_run {
        println!("  {:<25} {}", "Output size", format_size(bytes, BINARY));
    }
    println!("  {:<25} {}", "Output directory", output_dir.display());
    println!("  {:<25} {}", "Summary", summary_path.display());
    println!("  {:<25} {:.2?}", "Elapsed", elapsed);
    println!();
}
