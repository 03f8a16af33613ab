//! mei-clean: removes unreferenced and identical duplicate zones from MEI files.

use clap::Parser;
use flexi_logger::Logger;
use mei_cleaner::batch::clean_mei_files;
use mei_cleaner::harness::check_mei_files;
use mei_cleaner::report::{ReportFormat, ReportSink};
use mei_cleaner::{CleaningSettings, MeiCleaner};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mei-clean", version)]
#[command(about = "Utilities for cleaning MEI files", long_about = None)]
struct Args {
    /// MEI file to clean, or a directory whose .mei files are all cleaned
    #[arg(value_name = "MEI_PATH")]
    mei_path: PathBuf,

    /// Remove zones that are defined but not referenced anywhere in the body
    #[arg(long)]
    remove_unreferenced_bounding_boxes: bool,

    /// Remove duplicate zones and the identical elements that reference them
    #[arg(long)]
    remove_identical_duplicates: bool,

    /// Report duplicate zones referenced by different, non-identical elements
    #[arg(long)]
    raise_nonidentical_duplicates: bool,

    /// Where to save cleaned output (file or directory, matching MEI_PATH);
    /// defaults to overwriting MEI_PATH
    #[arg(long, value_name = "PATH")]
    destination_path: Option<PathBuf>,

    /// Append non-identical duplicate reports to this file instead of printing them
    #[arg(long, value_name = "FILE")]
    report_file: Option<PathBuf>,

    /// Conflict report layout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report_format: ReportFormat,

    /// Only check that every declared zone is referenced (recursive for directories)
    #[arg(long)]
    check: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log spec for the `-v` count; `RUST_LOG` still wins when set
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _logger = match Logger::try_with_env_or_str(log_level(args.verbose)).and_then(|logger| logger.start()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to initialize logger: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.check {
        return match check_mei_files(&args.mei_path) {
            Ok(failures) if failures.is_empty() => ExitCode::SUCCESS,
            Ok(failures) => {
                for failure in &failures {
                    eprintln!(
                        "{}: {} unreferenced zones detected in this file: {}",
                        failure.path.display(),
                        failure.unreferenced.len(),
                        failure.unreferenced.join(", ")
                    );
                }
                ExitCode::FAILURE
            }
            Err(e) => {
                log::error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let cleaner = MeiCleaner::new(CleaningSettings {
        remove_unreferenced: args.remove_unreferenced_bounding_boxes,
        remove_identical_duplicates: args.remove_identical_duplicates,
        raise_nonidentical_duplicates: args.raise_nonidentical_duplicates,
    });
    log::debug!("{:?}", cleaner.settings());
    let sink = match args.report_file {
        Some(path) => ReportSink::File(path),
        None => ReportSink::Stdout,
    };

    match clean_mei_files(
        &args.mei_path,
        args.destination_path.as_deref(),
        &cleaner,
        &sink,
        args.report_format,
    ) {
        Ok(summaries) => {
            log::debug!("{} file(s) cleaned", summaries.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
