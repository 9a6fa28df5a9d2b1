// In-process WAV meter
use super::LoudnessMeter;
use crate::error::{AutocutError, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decodes WAV chunks with `hound` and computes the mean power in dBFS,
/// matching what FFmpeg's volumedetect reports as `mean_volume`.
pub struct NativeMeter;

#[async_trait]
impl LoudnessMeter for NativeMeter {
    async fn measure(&self, path: &Path) -> Result<f64> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || mean_volume_db(&path))
            .await
            .map_err(|e| AutocutError::Io(std::io::Error::other(e)))?
    }

    fn name(&self) -> &'static str {
        "Native WAV"
    }
}

/// Mean volume of a WAV file in dBFS.
pub fn mean_volume_db(path: &Path) -> Result<f64> {
    if !path.exists() {
        return Err(AutocutError::FileNotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path)
        .map_err(|e| AutocutError::Parse(format!("WAV file {}: {e}", path.display())))?;
    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / full_scale))
                .collect::<std::result::Result<_, _>>()
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<_, _>>(),
    }
    .map_err(|e| AutocutError::Parse(format!("WAV samples {}: {e}", path.display())))?;

    debug!("Decoded {} samples from {}", samples.len(), path.display());

    power_to_db(&samples).ok_or_else(|| AutocutError::NoSignal(path.display().to_string()))
}

/// `10 * log10(mean(x²))`, or `None` for empty or all-zero input.
pub fn power_to_db(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mean_square = samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64;
    if mean_square <= 0.0 {
        return None;
    }

    Some(10.0 * mean_square.log10())
}
