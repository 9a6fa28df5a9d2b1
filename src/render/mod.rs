//! Cutting, re-timing and joining video parts with FFmpeg.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::analysis::RenderJob;
use crate::audio::run_ffmpeg;
use crate::error::{AutocutError, Result};

/// Re-encode so every frame is a keyframe and cuts land exactly.
pub async fn set_keyframes(input: &Path, output: &Path) -> Result<()> {
    info!("Re-encoding {} with a keyframe on every frame", input.display());

    run_ffmpeg([
        OsStr::new("-i"),
        input.as_os_str(),
        OsStr::new("-x264opts"),
        OsStr::new("keyint=1"),
        OsStr::new("-y"),
        output.as_os_str(),
    ])
    .await?;

    Ok(())
}

/// Chain of `atempo` filters whose product is `factor`.
///
/// Each link stays within `[0.5, 2.0]`, the range every FFmpeg version
/// accepts.
pub fn atempo_chain(factor: f64) -> String {
    let mut links = Vec::new();
    let mut remaining = factor;

    while remaining > 2.0 {
        links.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        links.push(0.5);
        remaining /= 0.5;
    }
    links.push(remaining);

    links
        .iter()
        .map(|f| format!("atempo={}", format_number(*f)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Filter graph applying `factor` to both tracks.
pub fn speed_filter(factor: f64) -> String {
    format!(
        "[0:v]setpts={}*PTS[v];[0:a]{}[a]",
        format_number(1.0 / factor),
        atempo_chain(factor)
    )
}

/// Shortest decimal that parses back to `value`; never rounds small
/// factors to zero.
fn format_number(value: f64) -> String {
    value.to_string()
}

/// File name for a rendered part; zero-padded so name order is job order.
pub fn part_file_name(index: usize) -> String {
    format!("{:06}.mp4", index)
}

/// Cut one job's slice from `source`, re-time it and write it into
/// `output_dir`.
pub async fn render_job(source: &Path, job: &RenderJob, output_dir: &Path) -> Result<PathBuf> {
    let output = output_dir.join(part_file_name(job.index));
    let start = format!("{:.6}", job.source_start);
    let duration = format!("{:.6}", job.rendered_duration);
    let filter = speed_filter(job.factor);

    debug!(
        "Rendering part {}: {}s + {:.3}s at {}x -> {:.3}s",
        job.index, start, job.source_duration, job.factor, job.rendered_duration
    );

    run_ffmpeg([
        OsStr::new("-ss"),
        OsStr::new(&start),
        OsStr::new("-i"),
        source.as_os_str(),
        OsStr::new("-t"),
        OsStr::new(&duration),
        OsStr::new("-filter_complex"),
        OsStr::new(&filter),
        OsStr::new("-map"),
        OsStr::new("[v]"),
        OsStr::new("-map"),
        OsStr::new("[a]"),
        OsStr::new("-y"),
        output.as_os_str(),
    ])
    .await?;

    Ok(output)
}

/// Render every job in order.
pub async fn render_all(
    source: &Path,
    jobs: &[RenderJob],
    output_dir: &Path,
    show_progress: bool,
) -> Result<Vec<PathBuf>> {
    if jobs.is_empty() {
        return Err(AutocutError::NothingToRender(
            "every segment was dropped".to_string(),
        ));
    }

    tokio::fs::create_dir_all(output_dir).await?;

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} parts ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let mut parts = Vec::with_capacity(jobs.len());
    for job in jobs {
        parts.push(render_job(source, job, output_dir).await?);
        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Rendering complete");
    }

    info!("Rendered {} parts into {}", parts.len(), output_dir.display());
    Ok(parts)
}

/// Contents of an FFmpeg concat demuxer list.
pub fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| {
            let path = p.to_string_lossy().replace('\'', "'\\''");
            format!("file '{}'\n", path)
        })
        .collect()
}

/// Join rendered parts into `output` without re-encoding.
pub async fn concat_parts(parts: &[PathBuf], output: &Path) -> Result<()> {
    if parts.is_empty() {
        return Err(AutocutError::NothingToRender("no parts to join".to_string()));
    }

    let list_path = output.with_extension("concat.txt");
    tokio::fs::write(&list_path, concat_list(parts)).await?;

    info!("Joining {} parts into {}", parts.len(), output.display());

    let result = run_ffmpeg([
        OsStr::new("-f"),
        OsStr::new("concat"),
        OsStr::new("-safe"),
        OsStr::new("0"),
        OsStr::new("-i"),
        list_path.as_os_str(),
        OsStr::new("-c"),
        OsStr::new("copy"),
        OsStr::new("-y"),
        output.as_os_str(),
    ])
    .await;

    let _ = tokio::fs::remove_file(&list_path).await;
    result.map(|_| ())
}
