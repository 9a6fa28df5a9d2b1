use anyhow::{Context, Result};
use autocut::config::{Config, Meter, ReportFormat, Speed, Threshold};
use autocut::interactive::run_interactive_wizard;
use autocut::pipeline::{derive_output_path, print_summary, remove_silence_with_cancel, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "autocut")]
#[command(version, about = "Remove or speed up the silent parts of a video")]
#[command(long_about = "Measures the loudness of short audio chunks, smooths and thresholds it, \
and re-encodes sounded and silent stretches at their own playback speed. \
Run without an input file to start the interactive wizard.")]
struct Cli {
    /// Input video file (omit to start the interactive wizard)
    input: Option<PathBuf>,

    /// Output video file (defaults to <input>_cut.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chunk length in seconds (defaults to one video frame)
    #[arg(long)]
    chunk_duration: Option<f64>,

    /// Speed for sounded parts: a factor such as 1 or 1.5x, or "drop"
    #[arg(long)]
    sounded_speed: Option<Speed>,

    /// Speed for silent parts: a factor such as 4 or 8x, or "drop"
    #[arg(long)]
    silent_speed: Option<Speed>,

    /// Silence threshold in dB, or "auto" for the average loudness
    #[arg(short, long, allow_hyphen_values = true)]
    threshold: Option<Threshold>,

    /// Smoothing radius for the loudness signal
    #[arg(long)]
    round1: Option<usize>,

    /// Smoothing radius for the sounded flags
    #[arg(long)]
    round2: Option<usize>,

    /// Number of chunks measured concurrently
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Loudness meter: volumedetect, native
    #[arg(short, long)]
    meter: Option<Meter>,

    /// Write a per-chunk report next to the output: csv, json
    #[arg(short, long)]
    report: Option<ReportFormat>,

    /// Ignore and do not update the loudness cache
    #[arg(long)]
    no_cache: bool,

    /// Keep intermediate files after the run
    #[arg(long)]
    keep_workspace: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(d) = self.chunk_duration {
            config.cut.chunk_duration = Some(d);
        }
        if let Some(speed) = self.sounded_speed {
            config.cut.sounded_speed = speed;
        }
        if let Some(speed) = self.silent_speed {
            config.cut.silent_speed = speed;
        }
        if let Some(threshold) = self.threshold {
            config.cut.threshold = threshold;
        }
        if let Some(r) = self.round1 {
            config.cut.smoothing_radius_1 = r;
        }
        if let Some(r) = self.round2 {
            config.cut.smoothing_radius_2 = r;
        }
        if let Some(c) = self.concurrency {
            config.concurrency = c;
        }
        if let Some(meter) = self.meter {
            config.meter = meter;
        }
        if self.no_cache {
            config.use_cache = false;
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            if cancelled.swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
            eprintln!("\nCancelling after the current stage... (press Ctrl+C again to abort)");
        }) {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    }

    let (input, output, pipeline_config) = match cli.input.clone() {
        Some(input) => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }

            let mut config = Config::load().context("Failed to load configuration")?;
            cli.apply(&mut config);
            config
                .validate()
                .context("Configuration validation failed")?;

            let output = cli.output.clone().unwrap_or_else(|| derive_output_path(&input));
            let pipeline_config = PipelineConfig {
                report: cli.report,
                show_progress: !cli.quiet,
                keep_workspace: cli.keep_workspace,
                ..PipelineConfig::from(&config)
            };
            (input, output, pipeline_config)
        }
        None => {
            let wizard = run_interactive_wizard().context("Interactive setup failed")?;
            let output = cli.output.clone().unwrap_or(wizard.output);
            let pipeline_config = PipelineConfig {
                keep_workspace: cli.keep_workspace,
                ..wizard.pipeline_config
            };
            (wizard.input, output, pipeline_config)
        }
    };

    info!("Input:     {}", input.display());
    info!("Output:    {}", output.display());
    info!("Sounded:   {}", pipeline_config.cut.sounded_speed);
    info!("Silent:    {}", pipeline_config.cut.silent_speed);
    info!("Threshold: {}", pipeline_config.cut.threshold);
    info!("Meter:     {}", pipeline_config.meter);

    let result = remove_silence_with_cancel(&input, &output, pipeline_config, cancelled)
        .await
        .with_context(|| format!("Failed to process {}", input.display()))?;

    print_summary(&result);

    Ok(())
}
