// FFmpeg volumedetect meter
use super::LoudnessMeter;
use crate::audio::run_ffmpeg;
use crate::error::{AutocutError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

/// Runs the `volumedetect` filter and reads `mean_volume` from the log.
pub struct VolumeDetectMeter;

#[async_trait]
impl LoudnessMeter for VolumeDetectMeter {
    async fn measure(&self, path: &Path) -> Result<f64> {
        if !path.exists() {
            return Err(AutocutError::FileNotFound(path.display().to_string()));
        }

        let log = run_ffmpeg([
            OsStr::new("-i"),
            path.as_os_str(),
            OsStr::new("-af"),
            OsStr::new("volumedetect"),
            OsStr::new("-f"),
            OsStr::new("null"),
            OsStr::new("-"),
        ])
        .await?;

        parse_mean_volume(&log)
            .ok_or_else(|| AutocutError::NoSignal(path.display().to_string()))
    }

    fn name(&self) -> &'static str {
        "FFmpeg volumedetect"
    }
}

fn mean_volume_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"mean_volume:\s*(-?(?:\d+(?:\.\d*)?|inf))\s*dB").expect("Invalid regex")
    })
}

/// Extract the first finite `mean_volume` value from a volumedetect log.
pub fn parse_mean_volume(log: &str) -> Option<f64> {
    let caps = mean_volume_regex().captures(log)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
[Parsed_volumedetect_0 @ 0x600000c8c000] n_samples: 2940
[Parsed_volumedetect_0 @ 0x600000c8c000] mean_volume: -27.3 dB
[Parsed_volumedetect_0 @ 0x600000c8c000] max_volume: -12.1 dB
[Parsed_volumedetect_0 @ 0x600000c8c000] histogram_12db: 3
";

    #[test]
    fn test_parse_mean_volume() {
        assert_eq!(parse_mean_volume(LOG), Some(-27.3));
    }

    #[test]
    fn test_parse_integer_and_positive() {
        assert_eq!(parse_mean_volume("mean_volume: -91 dB"), Some(-91.0));
        assert_eq!(parse_mean_volume("mean_volume: 0.0 dB"), Some(0.0));
    }

    #[test]
    fn test_parse_missing_statistic() {
        assert_eq!(parse_mean_volume("n_samples: 0\n"), None);
        assert_eq!(parse_mean_volume(""), None);
    }

    #[test]
    fn test_parse_infinite_is_no_signal() {
        assert_eq!(parse_mean_volume("mean_volume: -inf dB"), None);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = VolumeDetectMeter.measure(Path::new("/nonexistent/x.wav")).await;
        assert!(matches!(result, Err(AutocutError::FileNotFound(_))));
    }
}
