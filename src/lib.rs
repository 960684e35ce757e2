//! imgdupe - perceptual duplicate image finder
//!
//! Walks a folder, fingerprints every image with a perceptual hash (dHash,
//! simplified pHash or aHash), groups images whose fingerprints are within a
//! Hamming-distance threshold of a group representative, and optionally
//! copies them into "unique" and "duplicates" folders with an audit log.
//!
//! The library entry point for the binary is [`run_app`].

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use actions::{OrganizeConfig, OrganizeReport, Organizer};
use cli::{Cli, Commands, CompareArgs, HashArgs, OutputFormat, ScanArgs};
use config::Config;
use duplicates::{
    DuplicateFinder, FinderConfig, GroupingResult, HashedImage, ScanSummary,
    RECOMMENDED_MAX_THRESHOLD,
};
use error::ExitCode;
use output::{CsvOutput, JsonOutput, TextOutput};
use progress::{Progress, ProgressCallback};
use scanner::{Fingerprint, HashSize, PerceptualHasher, WalkerConfig};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable scan path,
/// interruption, or output failures. Unreadable images are not errors; they
/// turn the exit code into [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => run_scan(args, &config, cli.quiet, !cli.no_color),
        Commands::Hash(args) => run_hash(&args, &config),
        Commands::Compare(args) => run_compare(&args, &config),
    }
}

fn resolve_hash_size(flag: Option<u32>, config: &Config) -> anyhow::Result<HashSize> {
    match flag {
        Some(n) => HashSize::new(n).context("invalid --hash-size"),
        None => Ok(config.hash_size),
    }
}

fn run_scan(args: ScanArgs, config: &Config, quiet: bool, color: bool) -> anyhow::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let exit_code = scan_to(&args, config, quiet, color, &mut out)?;
    out.flush()?;
    Ok(exit_code)
}

/// Scan, report and optionally organize, writing reports to `out`.
///
/// Text and CSV reports are written before the confirmation prompt. JSON is
/// written last so that its exit code includes the outcome of organizing.
fn scan_to<W: Write>(
    args: &ScanArgs,
    config: &Config,
    quiet: bool,
    color: bool,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    let algorithm = args.algorithm.unwrap_or(config.algorithm);
    let hash_size = resolve_hash_size(args.hash_size, config)?;
    let threshold = args.threshold.unwrap_or(config.threshold);
    config::check_threshold(threshold, hash_size).context("invalid threshold")?;
    if threshold > RECOMMENDED_MAX_THRESHOLD {
        log::warn!(
            "Threshold {} is above the recommended range 0-{}; expect false matches",
            threshold,
            RECOMMENDED_MAX_THRESHOLD
        );
    }

    let walker_config = WalkerConfig {
        follow_symlinks: args.follow_symlinks || config.follow_symlinks,
        skip_hidden: args.skip_hidden || config.skip_hidden,
        extensions: config.extensions.clone(),
        ignore_patterns: args.ignore_patterns.clone(),
    };

    let shutdown = signal::install_handler().context("failed to install Ctrl+C handler")?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));

    let finder_config = FinderConfig::default()
        .with_algorithm(algorithm)
        .with_hash_size(hash_size)
        .with_threshold(threshold)
        .with_io_threads(args.threads.unwrap_or(config.threads))
        .with_walker_config(walker_config)
        .with_shutdown_flag(shutdown.flag())
        .with_progress_callback(Arc::clone(&progress));

    let root = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let (result, summary) = DuplicateFinder::new(finder_config)
        .find_duplicates(&root)
        .with_context(|| format!("failed to scan {}", args.path.display()))?;

    match args.output {
        OutputFormat::Text => {
            TextOutput::new(&result, &summary)
                .with_color(color)
                .write_to(out)
                .context("failed to write report")?;
        }
        OutputFormat::Csv => {
            CsvOutput::new(&result)
                .write_to(&mut *out)
                .context("failed to write CSV")?;
        }
        OutputFormat::Json => {}
    }
    out.flush()?;

    let report = if !args.organize {
        None
    } else if result.groups().is_empty() {
        log::info!("No duplicates found; nothing to organize");
        None
    } else {
        organize(args, &root, &result, &summary, progress)?
    };

    let exit_code = final_exit_code(scan_exit_code(&result, &summary), report.as_ref());

    match args.output {
        OutputFormat::Json => {
            JsonOutput::new(&result, &summary, exit_code)
                .write_to(out, true)
                .context("failed to write JSON")?;
        }
        OutputFormat::Text => {
            if let Some(ref report) = report {
                writeln!(out, "{}", report.summary())?;
                if let Some(ref log_path) = report.log_path {
                    writeln!(out, "Copy log: {}", log_path.display())?;
                }
            }
        }
        OutputFormat::Csv => {}
    }

    Ok(exit_code)
}

/// Exit code once organizing is done; failed copies downgrade success.
fn final_exit_code(scan_code: ExitCode, report: Option<&OrganizeReport>) -> ExitCode {
    match report {
        Some(report) if !report.all_succeeded() => ExitCode::PartialSuccess,
        _ => scan_code,
    }
}

/// Exit code for a completed scan.
fn scan_exit_code(result: &GroupingResult<HashedImage>, summary: &ScanSummary) -> ExitCode {
    if summary.has_failures() {
        ExitCode::PartialSuccess
    } else if result.groups().is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn organize(
    args: &ScanArgs,
    root: &std::path::Path,
    result: &GroupingResult<HashedImage>,
    summary: &ScanSummary,
    progress: Arc<dyn ProgressCallback>,
) -> anyhow::Result<Option<OrganizeReport>> {
    let mut config = OrganizeConfig::for_source(root).with_dry_run(args.dry_run);
    if let Some(ref dir) = args.unique_dir {
        config.unique_dir = dir.clone();
    }
    if let Some(ref dir) = args.duplicate_dir {
        config.duplicate_dir = dir.clone();
    }
    if let Some(ref dir) = args.log_dir {
        config = config.with_log_dir(dir.clone());
    }

    if !args.yes && !args.dry_run {
        let question = format!(
            "Copy images into {} and {}? (y/n): ",
            config.unique_dir.display(),
            config.duplicate_dir.display()
        );
        let stdin = io::stdin();
        let confirmed = confirm(&mut stdin.lock(), &mut io::stderr(), &question)
            .context("failed to read confirmation")?;
        if !confirmed {
            eprintln!("Operation cancelled");
            return Ok(None);
        }
    }

    // Undecodable images have no fingerprint but are still kept.
    let unreadable: Vec<PathBuf> = summary.skipped.iter().map(|s| s.path.clone()).collect();
    let report = Organizer::new(config)
        .with_progress_callback(progress)
        .organize(result, &unreadable)
        .context("failed to organize images")?;
    Ok(Some(report))
}

/// Ask a yes/no question; only `y` or `yes` (any case) confirms.
fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn run_hash(args: &HashArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let hasher = PerceptualHasher::new(
        args.algorithm.unwrap_or(config.algorithm),
        resolve_hash_size(args.hash_size, config)?,
    );

    let mut failures = 0;
    for file in &args.files {
        match hasher.compute_hash(file) {
            Ok(fingerprint) => println!("{}  {}", fingerprint, file.display()),
            Err(e) => {
                failures += 1;
                log::error!("{}", e);
            }
        }
    }

    if failures == args.files.len() {
        anyhow::bail!("no image could be fingerprinted");
    }
    Ok(if failures > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_compare(args: &CompareArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let bits = resolve_hash_size(args.hash_size, config)?.bits();
    let first = Fingerprint::from_hex(&args.first, bits).context("invalid first fingerprint")?;
    let second =
        Fingerprint::from_hex(&args.second, bits).context("invalid second fingerprint")?;
    let distance = first.distance(&second)?;
    println!("{distance}");
    Ok(ExitCode::Success)
}
