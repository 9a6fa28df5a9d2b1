use crate::analysis::{
    build_segments, plan_speeds, render_jobs, rendered_total, ActivityClassifier, ChunkAnalysis,
    Segment, SpeedPlan,
};
use crate::audio::{
    check_ffmpeg, check_ffprobe, cleanup_chunks, extract_audio_chunks, probe_media,
    transcode_to_mp4, AudioChunk,
};
use crate::cache::VolumeCache;
use crate::config::{Config, CutConfig, Meter, ReportFormat};
use crate::error::{AutocutError, Result};
use crate::measure::{create_meter, VolumeSampler};
use crate::render::{concat_parts, render_all, set_keyframes};
use crate::report::{create_formatter, json::JsonReport, write_report, ReportFormatter};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Frame rate assumed when the source has no usable video stream.
const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Configuration for the silence removal pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cut: CutConfig,
    pub meter: Meter,
    /// Number of chunks measured at once.
    pub concurrency: usize,
    /// Write a per-chunk report next to the output.
    pub report: Option<ReportFormat>,
    /// Reuse loudness values persisted by earlier runs.
    pub use_cache: bool,
    pub show_progress: bool,
    /// Leave the intermediate files on disk after the run.
    pub keep_workspace: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cut: CutConfig::default(),
            meter: Meter::default(),
            concurrency: 4,
            report: None,
            use_cache: true,
            show_progress: true,
            keep_workspace: false,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            cut: config.cut.clone(),
            meter: config.meter,
            concurrency: config.concurrency,
            use_cache: config.use_cache,
            ..Self::default()
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.cut.validate()?;
        if self.concurrency == 0 {
            return Err(AutocutError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Statistics from the silence removal process.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    /// Transcoding and chunk extraction.
    pub extraction_time: Duration,
    pub measurement_time: Duration,
    pub render_time: Duration,
    pub chunk_duration: f64,
    pub chunks: usize,
    /// Chunks measured rather than served from the cache.
    pub measured_chunks: usize,
    pub silent_chunks: usize,
    /// Threshold applied after resolving `auto`.
    pub threshold: f64,
    pub sounded_segments: usize,
    pub silent_segments: usize,
    pub source_duration: Duration,
    /// Planned output length in seconds.
    pub rendered_duration: f64,
    pub meter: String,
}

/// Result of the silence removal pipeline.
#[derive(Debug)]
pub struct PipelineResult {
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Intermediate files, when kept.
    pub workspace: Option<PathBuf>,
    pub chunks: Vec<ChunkAnalysis>,
    pub segments: Vec<Segment>,
    pub plans: Vec<SpeedPlan>,
    pub stats: PipelineStats,
}

/// Scratch directory holding the intermediate files of one run.
pub struct Workspace {
    dir: TempDir,
    keep: bool,
    cancelled: Arc<AtomicBool>,
}

impl Workspace {
    pub fn new(keep: bool, cancelled: Arc<AtomicBool>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("autocut-")
            .keep(keep)
            .tempdir()
            .map_err(|e| {
                AutocutError::Io(std::io::Error::other(format!(
                    "Failed to create temp directory: {}",
                    e
                )))
            })?;

        debug!("Using workspace: {:?}", dir.path());
        Ok(Self {
            dir,
            keep,
            cancelled,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Source transcoded to MP4.
    pub fn input_video(&self) -> PathBuf {
        self.path().join("input.mp4")
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.path().join("sounds")
    }

    /// Source re-encoded with a keyframe on every frame.
    pub fn keyframed_video(&self) -> PathBuf {
        self.path().join("keyframed.mp4")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.path().join("videos")
    }

    fn kept_path(&self) -> Option<PathBuf> {
        self.keep.then(|| self.path().to_path_buf())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let path = self.dir.path();
        if self.cancelled.load(Ordering::Relaxed) {
            warn!("Pipeline cancelled, cleaning up workspace: {:?}", path);
        } else if self.keep {
            info!("Keeping workspace: {:?}", path);
        } else {
            debug!("Cleaning up workspace: {:?}", path);
        }
    }
}

/// Delete measured chunk files; failures are logged and otherwise ignored.
fn remove_chunks(chunks: &[AudioChunk]) -> bool {
    match cleanup_chunks(chunks) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to remove audio chunks: {}", e);
            false
        }
    }
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        Err(AutocutError::Cancelled)
    } else {
        Ok(())
    }
}

fn stage_spinner(multi: Option<&MultiProgress>, message: &str) -> Option<ProgressBar> {
    multi.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Remove or re-time the silent parts of a video.
///
/// Stages:
/// 1. Transcode the input and split its audio into chunks
/// 2. Measure the loudness of every chunk
/// 3. Classify chunks and build speed-tagged segments
/// 4. Render each segment at its speed and join the parts
pub async fn remove_silence(
    input: &Path,
    output: &Path,
    pipeline_config: PipelineConfig,
) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    remove_silence_with_cancel(input, output, pipeline_config, cancelled).await
}

/// Remove silence with cancellation support.
pub async fn remove_silence_with_cancel(
    input: &Path,
    output: &Path,
    pipeline_config: PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    pipeline_config.validate()?;

    if !input.exists() {
        return Err(AutocutError::FileNotFound(input.display().to_string()));
    }

    check_ffmpeg()?;
    check_ffprobe()?;

    let workspace = Workspace::new(pipeline_config.keep_workspace, cancelled.clone())?;

    let multi_progress = pipeline_config.show_progress.then(MultiProgress::new);

    check_cancelled(&cancelled)?;

    // Stage 1: transcode and split the audio track
    info!("Stage 1/4: Extracting audio chunks from {:?}", input);
    let extraction_start = Instant::now();

    let spinner = stage_spinner(multi_progress.as_ref(), "Transcoding input...");

    let video = workspace.input_video();
    transcode_to_mp4(input, &video).await?;
    let media = probe_media(&video).await?;

    let chunk_duration = match pipeline_config.cut.chunk_duration {
        Some(d) => d,
        None => {
            let fps = media.frame_rate.unwrap_or_else(|| {
                warn!(
                    "No frame rate detected, assuming {} fps",
                    FALLBACK_FRAME_RATE
                );
                FALLBACK_FRAME_RATE
            });
            1.0 / fps
        }
    };
    debug!("Chunk duration: {:.6}s", chunk_duration);

    if let Some(pb) = &spinner {
        pb.set_message("Splitting audio into chunks...");
    }

    let chunks = extract_audio_chunks(&video, &workspace.sounds_dir(), chunk_duration).await?;

    if let Some(pb) = spinner {
        pb.finish_with_message(format!(
            "✓ Extracted {} chunks ({:.1}s)",
            chunks.len(),
            media.duration.as_secs_f64()
        ));
    }

    let extraction_time = extraction_start.elapsed();
    info!(
        "Extracted {} chunks of {:.3}s in {:.2}s",
        chunks.len(),
        chunk_duration,
        extraction_time.as_secs_f64()
    );

    check_cancelled(&cancelled)?;

    // Stage 2: loudness measurement
    let meter = create_meter(pipeline_config.meter);
    let meter_name = meter.name().to_string();
    info!(
        "Stage 2/4: Measuring loudness with {} (concurrency: {})",
        meter_name, pipeline_config.concurrency
    );
    let measurement_start = Instant::now();

    let cache = match (pipeline_config.use_cache, VolumeCache::default_path()) {
        (true, Some(path)) => VolumeCache::open(path),
        _ => VolumeCache::in_memory(),
    };
    let cache = Arc::new(cache);

    let sampler = VolumeSampler::new(meter, pipeline_config.concurrency)
        .with_cache(cache.clone())
        .with_progress(pipeline_config.show_progress);
    let (volumes, sampling_stats) = sampler.sample(&chunks).await?;

    if let Err(e) = cache.persist() {
        warn!("Failed to save loudness cache: {}", e);
    }
    if !pipeline_config.keep_workspace {
        remove_chunks(&chunks);
    }

    let measurement_time = measurement_start.elapsed();

    check_cancelled(&cancelled)?;

    // Stage 3: classification and planning
    info!(
        "Stage 3/4: Classifying {} chunks (threshold: {})",
        volumes.len(),
        pipeline_config.cut.threshold
    );

    let classifier = ActivityClassifier::new(
        pipeline_config.cut.smoothing_radius_1,
        pipeline_config.cut.smoothing_radius_2,
    );
    let classification = classifier.classify(&volumes, pipeline_config.cut.threshold);
    let segments = build_segments(&classification.final_sounded(), chunk_duration);
    let plans = plan_speeds(
        &segments,
        pipeline_config.cut.sounded_speed,
        pipeline_config.cut.silent_speed,
    );
    let jobs = render_jobs(&plans);
    let rendered_duration = rendered_total(&plans);

    let sounded_segments = segments.iter().filter(|s| s.sounded).count();
    info!(
        "{} segments ({} sounded), {} render jobs, {:.1}s planned output",
        segments.len(),
        sounded_segments,
        jobs.len(),
        rendered_duration
    );

    let report_path = match pipeline_config.report {
        Some(format) => {
            let formatter: Box<dyn ReportFormatter> = match format {
                ReportFormat::Json => Box::new(JsonReport {
                    source_file: Some(input.display().to_string()),
                }),
                other => create_formatter(other),
            };
            Some(write_report(formatter.as_ref(), &classification, chunk_duration, output).await?)
        }
        None => None,
    };

    check_cancelled(&cancelled)?;

    // Stage 4: rendering
    info!("Stage 4/4: Rendering {} parts", jobs.len());
    let render_start = Instant::now();

    if jobs.is_empty() {
        return Err(AutocutError::NothingToRender(
            "every segment was dropped".to_string(),
        ));
    }

    let spinner = stage_spinner(multi_progress.as_ref(), "Setting keyframes...");
    let keyframed = workspace.keyframed_video();
    set_keyframes(&video, &keyframed).await?;
    if let Some(pb) = spinner {
        pb.finish_with_message("✓ Keyframes set");
    }

    check_cancelled(&cancelled)?;

    let parts = render_all(
        &keyframed,
        &jobs,
        &workspace.videos_dir(),
        pipeline_config.show_progress,
    )
    .await?;

    check_cancelled(&cancelled)?;

    let spinner = stage_spinner(multi_progress.as_ref(), "Joining parts...");
    concat_parts(&parts, output).await?;
    if let Some(pb) = spinner {
        pb.finish_with_message(format!("✓ Joined {} parts", parts.len()));
    }

    let render_time = render_start.elapsed();
    info!("Wrote {:?} in {:.2}s", output, render_time.as_secs_f64());

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        extraction_time,
        measurement_time,
        render_time,
        chunk_duration,
        chunks: chunks.len(),
        measured_chunks: sampling_stats.measured_chunks,
        silent_chunks: sampling_stats.silent_chunks,
        threshold: classification.threshold,
        sounded_segments,
        silent_segments: segments.len() - sounded_segments,
        source_duration: media.duration,
        rendered_duration,
        meter: meter_name,
    };

    Ok(PipelineResult {
        output_path: output.to_path_buf(),
        report_path,
        workspace: workspace.kept_path(),
        chunks: classification.chunks,
        segments,
        plans,
        stats,
    })
}

/// Default output path: `<stem>_cut.mp4` beside the input.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}_cut.mp4", stem.to_string_lossy()));
    output
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    let stats = &result.stats;
    let source = stats.source_duration.as_secs_f64();
    let saved = if source > 0.0 {
        (1.0 - stats.rendered_duration / source) * 100.0
    } else {
        0.0
    };

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Silence Removal Complete                 ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    if let Some(ref report) = result.report_path {
        println!("  Report:     {}", report.display());
    }
    if let Some(ref workspace) = result.workspace {
        println!("  Workspace:  {}", workspace.display());
    }
    println!(
        "  Duration:   {:.1}s -> {:.1}s ({:.0}% shorter)",
        source, stats.rendered_duration, saved
    );
    println!(
        "  Segments:   {} sounded, {} silent",
        stats.sounded_segments, stats.silent_segments
    );
    println!("  Threshold:  {:.2} dB", stats.threshold);
    println!("  Meter:      {}", stats.meter);
    println!();
    println!("  Timing:");
    println!(
        "    Extract:  {:.2}s ({} chunks of {:.3}s)",
        stats.extraction_time.as_secs_f64(),
        stats.chunks,
        stats.chunk_duration
    );
    println!(
        "    Measure:  {:.2}s ({} measured, {} silent)",
        stats.measurement_time.as_secs_f64(),
        stats.measured_chunks,
        stats.silent_chunks
    );
    println!("    Render:   {:.2}s", stats.render_time.as_secs_f64());
    println!("    Total:    {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
