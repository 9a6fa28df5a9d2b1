pub mod native;
pub mod sampler;
pub mod volumedetect;

pub use native::NativeMeter;
pub use sampler::{SamplingStats, VolumeSampler, SILENCE_FLOOR_DB};
pub use volumedetect::VolumeDetectMeter;

use crate::config::Meter;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Measures the mean loudness of an audio file in dBFS.
#[async_trait]
pub trait LoudnessMeter: Send + Sync {
    /// Returns `AutocutError::NoSignal` when the file yields no loudness
    /// statistic (typically pure digital silence).
    async fn measure(&self, path: &Path) -> Result<f64>;
    fn name(&self) -> &'static str;
}

pub fn create_meter(meter: Meter) -> Box<dyn LoudnessMeter> {
    match meter {
        Meter::VolumeDetect => Box::new(VolumeDetectMeter),
        Meter::Native => Box::new(NativeMeter),
    }
}
