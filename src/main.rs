//! Files Checker CLI
//!
//! Finds files with identical content in one or more directory trees.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use files_checker::{
    render_groups, render_summary, DirectoryScanner, DuplicateRegistry, ErrorPolicy,
    HashAlgorithm, ScanConfig, ScanReport,
};

const ABOUT: &str = r#"
Files Checker - find duplicate files by content

Examples:
  files_checker scan -p /path/to/dir              scan a single directory
  files_checker scan -p /photos -p /backup        scan several directories
  files_checker scan -p /data --skip-empty        ignore zero-byte files
  files_checker scan -p /data --full-path         print absolute paths
  files_checker scan -p /data --json              JSON report
"#;

/// Content-based duplicate file finder
#[derive(Parser)]
#[command(name = "files_checker")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for duplicate files
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory to scan (may be repeated)
    #[arg(short = 'p', long = "path", required = true)]
    paths: Vec<PathBuf>,

    /// Do not hash empty files; count them as skipped
    #[arg(long)]
    skip_empty: bool,

    /// Show full file paths instead of paths relative to the group location
    #[arg(long)]
    full_path: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Keep scanning after unreadable files and directories
    #[arg(long)]
    resilient: bool,

    /// Content hash function
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Sha256)]
    algorithm: HashAlgorithm,

    /// Hashing threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "1")]
    threads: usize,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Write JSON progress messages to stderr
    #[arg(long)]
    progress: bool,
}

impl ScanArgs {
    fn to_config(&self) -> ScanConfig {
        let policy = if self.resilient {
            ErrorPolicy::Resilient
        } else {
            ErrorPolicy::FailFast
        };

        ScanConfig::builder()
            .roots(self.paths.clone())
            .skip_empty(self.skip_empty)
            .full_paths(self.full_path)
            .error_policy(policy)
            .num_threads(self.threads)
            .show_progress(self.progress)
            .build()
    }
}

fn run(args: &ScanArgs) -> ExitCode {
    let registry = Arc::new(DuplicateRegistry::with_algorithm(args.algorithm));
    let scanner = match DirectoryScanner::new(args.to_config(), registry.clone()) {
        Ok(scanner) => scanner,
        Err(e) => {
            error!("Cannot create scanner: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = scanner.config();
    info!("Roots: {:?}", config.roots);
    info!(
        "Algorithm: {}, error policy: {:?}, threads: {}",
        scanner.algorithm(),
        config.error_policy,
        config.effective_threads()
    );

    if let Err(e) = scanner.scan_all() {
        error!("Cannot scan directory: {}", e);
        info!("{}", render_summary(&scanner.stats()));
        return ExitCode::FAILURE;
    }

    let report = ScanReport::new(
        config.roots.clone(),
        scanner.stats(),
        registry.duplicate_sets(),
    );
    info!(
        "Found {} duplicate files in {} groups",
        report.duplicate_files(),
        report.duplicates.len()
    );

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Cannot serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", render_groups(&report.duplicates, config.full_paths));
        if report.duplicates.is_empty() {
            println!("No duplicate files found");
        }
        println!("{}", render_summary(&report.stats));
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan(args)) => {
            let level = if args.debug { "debug" } else { "info" };
            env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
            run(&args)
        }
        None => {
            println!("{}", ABOUT);
            println!("Use 'files_checker scan -h' for scan options");
            ExitCode::SUCCESS
        }
    }
}
