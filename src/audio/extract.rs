use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{AutocutError, Result};

use super::chunk::list_chunks;
use super::{AudioChunk, MediaInfo};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            AutocutError::ffmpeg(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(AutocutError::ffmpeg("FFmpeg check failed"));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            AutocutError::ffprobe(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(AutocutError::ffprobe("FFprobe check failed"));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Run FFmpeg with the given arguments and return its log output.
///
/// FFmpeg writes its diagnostics (including filter statistics) to stderr,
/// which is returned on success. A non-zero exit is an error carrying the
/// tail of that log.
pub async fn run_ffmpeg<I, S>(args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = tokio::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-nostdin"])
        .args(args)
        .output()
        .await
        .map_err(|e| AutocutError::ffmpeg(format!("Failed to run FFmpeg: {e}")))?;

    let log = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(AutocutError::ffmpeg(format!(
            "exited with {}: {}",
            output.status,
            log_tail(&log, 5)
        )));
    }

    Ok(log)
}

async fn run_ffprobe<I, S>(args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = tokio::process::Command::new("ffprobe")
        .args(["-v", "error"])
        .args(args)
        .output()
        .await
        .map_err(|e| AutocutError::ffprobe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AutocutError::ffprobe(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn log_tail(log: &str, lines: usize) -> String {
    let all: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join(" | ")
}

/// Get media duration using FFprobe.
pub async fn get_media_duration(input: &Path) -> Result<Duration> {
    let duration_str = run_ffprobe([
        OsStr::new("-show_entries"),
        OsStr::new("format=duration"),
        OsStr::new("-of"),
        OsStr::new("default=noprint_wrappers=1:nokey=1"),
        input.as_os_str(),
    ])
    .await?;

    let duration_secs: f64 = duration_str.parse().map_err(|e| {
        AutocutError::Parse(format!("duration '{}': {e}", duration_str))
    })?;

    Ok(Duration::from_secs_f64(duration_secs.max(0.0)))
}

/// Get the frame rate of the first video stream using FFprobe.
pub async fn get_frame_rate(input: &Path) -> Result<f64> {
    let rate = run_ffprobe([
        OsStr::new("-select_streams"),
        OsStr::new("v:0"),
        OsStr::new("-show_entries"),
        OsStr::new("stream=r_frame_rate"),
        OsStr::new("-of"),
        OsStr::new("default=noprint_wrappers=1:nokey=1"),
        input.as_os_str(),
    ])
    .await?;

    parse_frame_rate(&rate)
}

/// Parse an FFprobe rational such as `30000/1001` or a plain number.
pub fn parse_frame_rate(value: &str) -> Result<f64> {
    let value = value.trim();
    let invalid = || AutocutError::Parse(format!("frame rate '{value}'"));

    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| invalid())?;
            let den: f64 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0.0 {
                return Err(invalid());
            }
            num / den
        }
        None => value.parse().map_err(|_| invalid())?,
    };

    if !fps.is_finite() || fps <= 0.0 {
        return Err(invalid());
    }
    Ok(fps)
}

/// Probe duration and frame rate of the input.
pub async fn probe_media(input: &Path) -> Result<MediaInfo> {
    let duration = get_media_duration(input).await?;
    let frame_rate = match get_frame_rate(input).await {
        Ok(fps) => Some(fps),
        Err(e) => {
            debug!("No video frame rate for {}: {}", input.display(), e);
            None
        }
    };

    Ok(MediaInfo {
        duration,
        frame_rate,
    })
}

/// Re-encode the input into an MP4 container.
pub async fn transcode_to_mp4(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(AutocutError::FileNotFound(input.display().to_string()));
    }

    info!("Converting {} to MP4", input.display());

    run_ffmpeg([
        OsStr::new("-y"),
        OsStr::new("-i"),
        input.as_os_str(),
        output.as_os_str(),
    ])
    .await?;

    if !output.exists() {
        return Err(AutocutError::ffmpeg("Output file was not created"));
    }

    Ok(())
}

/// Split the audio track into WAV chunks of `chunk_duration` seconds.
///
/// Chunks are written as `%06d.wav` into `output_dir` and returned in
/// timeline order. The last chunk may be shorter.
pub async fn extract_audio_chunks(
    input: &Path,
    output_dir: &Path,
    chunk_duration: f64,
) -> Result<Vec<AudioChunk>> {
    if !input.exists() {
        return Err(AutocutError::FileNotFound(input.display().to_string()));
    }

    tokio::fs::create_dir_all(output_dir).await?;

    let segment_time = format!("{:.6}", chunk_duration);
    let pattern = output_dir.join("%06d.wav");

    debug!(
        "Extracting audio chunks of {}s into {}",
        segment_time,
        output_dir.display()
    );

    run_ffmpeg([
        OsStr::new("-y"),
        OsStr::new("-i"),
        input.as_os_str(),
        OsStr::new("-vn"),
        OsStr::new("-f"),
        OsStr::new("segment"),
        OsStr::new("-segment_time"),
        OsStr::new(&segment_time),
        pattern.as_os_str(),
    ])
    .await?;

    let chunks = list_chunks(output_dir)?;
    info!("Extracted {} audio chunks", chunks.len());
    Ok(chunks)
}
