//! # CLI Module
//!
//! Command-line interface for the image sequence checker.
//!
//! Every setting can come from a flag or from the environment variable
//! named in its help text; flags win. A `.env` file in the working
//! directory fills in variables the environment does not already set.
//!
//! ## Usage
//! ```bash
//! # Check a capture directory with MSE
//! seq-diff check ./captures --metric mse --threshold 0.005 --magick magick
//!
//! # Only look at a region, archive flagged frames
//! seq-diff check ./captures --crop-width 640 --crop-height 360 \
//!     --crop-offset-x 0 --crop-offset-y 0 --abnormal-dir abnormal
//!
//! # Machine-readable output
//! seq-diff check ./captures --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use image_sequence_diff::config::{AppConfig, Settings};
use image_sequence_diff::core::pipeline::{PipelineBuilder, PipelineResult};
use image_sequence_diff::core::reporter::{export_csv, format_result_line};
use image_sequence_diff::core::scanner::ScanConfig;
use image_sequence_diff::error::PipelineError;
use image_sequence_diff::events::{CompareEvent, Event, EventChannel, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

/// Exit code for invalid or missing settings
const EXIT_CONFIG: u8 = 2;
/// Exit code for any failure while running the pipeline
const EXIT_FAILURE: u8 = 1;

/// Image Sequence Diff - flag abnormal transitions between captured frames
#[derive(Parser, Debug)]
#[command(name = "seq-diff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare adjacent frames of a directory
    Check {
        /// Directory containing the frames
        input_dir: PathBuf,

        #[command(flatten)]
        settings: SettingArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Only print abnormal pairs
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Raw settings; validation happens in `AppConfig`
#[derive(Args, Debug)]
struct SettingArgs {
    /// Similarity metric: mse or ssim
    #[arg(short, long, env = "METRIC")]
    metric: Option<String>,

    /// Difference threshold (MSE: flag at or above, SSIM: flag below)
    #[arg(short, long, env = "DIFF_THRESHOLD", allow_hyphen_values = true)]
    threshold: Option<String>,

    /// ImageMagick executable
    #[arg(long, env = "MAGICK_PATH")]
    magick: Option<String>,

    /// FFmpeg executable
    #[arg(long, env = "FFMPEG_PATH")]
    ffmpeg: Option<String>,

    /// Sub-directory of the input directory that receives flagged frames
    #[arg(long, env = "ABNORMAL_IMAGES_DIRECTORY")]
    abnormal_dir: Option<String>,

    #[arg(long, env = "CROP_WIDTH")]
    crop_width: Option<String>,

    #[arg(long, env = "CROP_HEIGHT")]
    crop_height: Option<String>,

    #[arg(long, env = "CROP_OFFSET_X", allow_hyphen_values = true)]
    crop_offset_x: Option<String>,

    #[arg(long, env = "CROP_OFFSET_Y", allow_hyphen_values = true)]
    crop_offset_y: Option<String>,

    /// Where cropping happens: in-backend or preprocess
    #[arg(long, env = "CROP_MODE")]
    crop_mode: Option<String>,

    /// Number of concurrent comparisons (default: CPU count)
    #[arg(short, long, env = "WORKERS")]
    workers: Option<String>,

    /// Kill a comparison that runs longer than this many seconds
    #[arg(long, env = "COMPARE_TIMEOUT_SECS")]
    timeout: Option<String>,
}

impl From<SettingArgs> for Settings {
    fn from(args: SettingArgs) -> Self {
        Settings {
            magick_path: args.magick,
            ffmpeg_path: args.ffmpeg,
            metric: args.metric,
            diff_threshold: args.threshold,
            abnormal_images_directory: args.abnormal_dir,
            crop_width: args.crop_width,
            crop_height: args.crop_height,
            crop_offset_x: args.crop_offset_x,
            crop_offset_y: args.crop_offset_y,
            crop_mode: args.crop_mode,
            workers: args.workers,
            compare_timeout_secs: args.timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON summary for scripting
    Json,
    /// One CSV row per pair
    Csv,
}

/// Run the CLI
pub fn run() -> ExitCode {
    if let Err(e) = dotenvy::from_path(".env") {
        if !e.not_found() {
            print_error(&Term::stderr(), &format!("Failed to load .env: {e}"));
            return ExitCode::from(EXIT_CONFIG);
        }
    }
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input_dir,
            settings,
            output,
            include_hidden,
            quiet,
        } => run_check(&input_dir, settings.into(), output, include_hidden, quiet),
    }
}

fn run_check(
    input_dir: &Path,
    settings: Settings,
    output: OutputFormat,
    include_hidden: bool,
    quiet: bool,
) -> ExitCode {
    let term = Term::stderr();

    let config = match AppConfig::from_settings(&settings) {
        Ok(config) => config,
        Err(e) => {
            print_error(&term, &e.to_string());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Image Sequence Diff").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  {} threshold {}",
            style(config.metric).yellow(),
            config.threshold
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = PipelineBuilder::from_config(&config)
        .scan_config(ScanConfig {
            include_hidden,
            ..Default::default()
        })
        .build();

    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(phase.to_string());
                }
                Event::Compare(CompareEvent::Started { total_pairs, .. }) => {
                    pb.set_length(total_pairs as u64);
                    pb.set_position(0);
                }
                Event::Compare(CompareEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if p.is_abnormal {
                        pb.set_message(format!(
                            "abnormal: {}",
                            p.altered.file_name().unwrap_or_default().to_string_lossy()
                        ));
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let outcome = pipeline.run_with_events(input_dir, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = match outcome {
        Ok(result) => result,
        Err(PipelineError::InsufficientInput(e)) => {
            term.write_line(&format!("{} {}", style("Nothing to compare:").yellow(), e))
                .ok();
            return ExitCode::SUCCESS;
        }
        Err(e @ PipelineError::Config(_)) => {
            print_error(&term, &e.to_string());
            return ExitCode::from(EXIT_CONFIG);
        }
        Err(e) => {
            print_error(&term, &e.to_string());
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let written = match output {
        OutputFormat::Pretty => {
            print_pretty_results(&term, &result, quiet);
            Ok(())
        }
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Csv => export_csv(&result.results, io::stdout().lock()),
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&term, &format!("Failed to write output: {e}"));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn print_error(term: &Term, message: &str) {
    term.write_line(&format!("{} {}", style("error:").red().bold(), message))
        .ok();
}

fn print_pretty_results(term: &Term, result: &PipelineResult, quiet: bool) {
    for r in &result.results {
        if quiet && !r.is_abnormal {
            continue;
        }
        let line = format_result_line(r);
        if r.is_abnormal {
            println!("{}", style(line).yellow());
        } else {
            println!("{}", style(line).green());
        }
    }

    term.write_line("").ok();
    term.write_line(&format!("{} Check Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} frames, {} pairs compared in {:.1}s",
        style(result.total_images).cyan(),
        style(result.results.len()).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    let abnormal = result.abnormal_pairs();
    if abnormal == 0 {
        term.write_line(&format!("  {} No abnormal transitions", style("✓").green()))
            .ok();
    } else {
        term.write_line(&format!(
            "  {} abnormal transitions involving {} frames",
            style(abnormal).yellow().bold(),
            style(result.anomalies.len()).yellow()
        ))
        .ok();
    }

    if let Some(destination) = &result.archived.destination {
        term.write_line(&format!(
            "  {} frames copied to {}",
            style(result.archived.copied.len()).cyan(),
            style(destination.display()).dim()
        ))
        .ok();
    }
}

fn print_json_results(result: &PipelineResult) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&result.summary()).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}
