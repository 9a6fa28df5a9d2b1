use crate::error::{AutocutError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Playback speed applied to a segment.
///
/// `Drop` removes the segment from the output entirely (a jump cut).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Speed {
    Factor(f64),
    Drop,
}

impl Speed {
    /// The finite speed factor, or `None` when the segment is dropped.
    pub fn factor(&self) -> Option<f64> {
        match self {
            Speed::Factor(f) => Some(*f),
            Speed::Drop => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Speed::Drop)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if let Speed::Factor(f) = self {
            if !f.is_finite() || *f <= 0.0 {
                return Err(AutocutError::Config(format!(
                    "{name} must be a positive number or 'drop', got {f}"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speed::Factor(factor) => write!(f, "{}x", factor),
            Speed::Drop => write!(f, "drop"),
        }
    }
}

impl std::str::FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "drop" | "skip" | "inf" | "infinity" => return Ok(Speed::Drop),
            _ => {}
        }

        let number = s.strip_suffix('x').unwrap_or(&s);
        let factor: f64 = number
            .parse()
            .map_err(|_| format!("Unknown speed: {}. Use a positive number or 'drop'", s))?;

        if !factor.is_finite() || factor <= 0.0 {
            return Err(format!("Speed must be positive, got {}", s));
        }
        Ok(Speed::Factor(factor))
    }
}

impl TryFrom<String> for Speed {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Speed> for String {
    fn from(speed: Speed) -> Self {
        speed.to_string()
    }
}

/// Loudness threshold separating sounded from silent chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Threshold {
    /// Fixed level in dBFS.
    Fixed(f64),
    /// Mean of the raw (unsmoothed) chunk volumes.
    Auto,
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Fixed(-60.0)
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threshold::Fixed(db) => write!(f, "{}dB", db),
            Threshold::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for Threshold {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "auto" | "avg" | "mean" => return Ok(Threshold::Auto),
            _ => {}
        }

        let number = s.strip_suffix("db").unwrap_or(&s).trim();
        let db: f64 = number
            .parse()
            .map_err(|_| format!("Unknown threshold: {}. Use a dB value or 'auto'", s))?;

        if !db.is_finite() {
            return Err(format!("Threshold must be finite, got {}", s));
        }
        Ok(Threshold::Fixed(db))
    }
}

impl TryFrom<String> for Threshold {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Threshold> for String {
    fn from(threshold: Threshold) -> Self {
        threshold.to_string()
    }
}

/// Backend used to measure chunk loudness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meter {
    #[default]
    VolumeDetect,
    Native,
}

impl std::fmt::Display for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Meter::VolumeDetect => write!(f, "volumedetect"),
            Meter::Native => write!(f, "native"),
        }
    }
}

impl std::str::FromStr for Meter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "volumedetect" | "ffmpeg" => Ok(Meter::VolumeDetect),
            "native" => Ok(Meter::Native),
            _ => Err(format!(
                "Unknown meter: {}. Use 'volumedetect' or 'native'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}. Use 'csv' or 'json'", s)),
        }
    }
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// Parameters of the silence analysis and speed mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Chunk length in seconds. `None` uses the duration of one video frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_duration: Option<f64>,
    pub sounded_speed: Speed,
    pub silent_speed: Speed,
    pub threshold: Threshold,
    /// Radius of the loudness smoothing pass.
    pub smoothing_radius_1: usize,
    /// Radius of the sounded-flag smoothing pass.
    pub smoothing_radius_2: usize,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            chunk_duration: None,
            sounded_speed: Speed::Factor(1.0),
            silent_speed: Speed::Drop,
            threshold: Threshold::default(),
            smoothing_radius_1: 2,
            smoothing_radius_2: 0,
        }
    }
}

impl CutConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(d) = self.chunk_duration {
            if !d.is_finite() || d <= 0.0 {
                return Err(AutocutError::Config(format!(
                    "Chunk duration must be greater than 0, got {d}"
                )));
            }
        }

        self.sounded_speed.validate("Sounded speed")?;
        self.silent_speed.validate("Silent speed")?;

        if self.sounded_speed.is_drop() && self.silent_speed.is_drop() {
            return Err(AutocutError::Config(
                "Sounded and silent speed cannot both be 'drop'".to_string(),
            ));
        }

        if let Threshold::Fixed(db) = self.threshold {
            if !db.is_finite() {
                return Err(AutocutError::Config(format!(
                    "Threshold must be finite, got {db}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub cut: CutConfig,
    pub meter: Meter,
    pub concurrency: usize,
    pub use_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cut: CutConfig::default(),
            meter: Meter::default(),
            concurrency: 4,
            use_cache: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Ignoring invalid config {}: {}", config_path.display(), e),
                }
            }
        }

        // Override with environment variables
        if let Some(d) = env_parse::<f64>("AUTOCUT_CHUNK_DURATION") {
            config.cut.chunk_duration = Some(d);
        }
        if let Some(speed) = env_parse("AUTOCUT_SOUNDED_SPEED") {
            config.cut.sounded_speed = speed;
        }
        if let Some(speed) = env_parse("AUTOCUT_SILENT_SPEED") {
            config.cut.silent_speed = speed;
        }
        if let Some(threshold) = env_parse("AUTOCUT_THRESHOLD") {
            config.cut.threshold = threshold;
        }
        if let Some(meter) = env_parse("AUTOCUT_METER") {
            config.meter = meter;
        }
        if let Some(concurrency) = env_parse("AUTOCUT_CONCURRENCY") {
            config.concurrency = concurrency;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cut.validate()?;

        if self.concurrency == 0 {
            return Err(AutocutError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file_path().ok_or_else(|| {
            AutocutError::Config("No configuration directory on this platform".to_string())
        })?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| AutocutError::Parse(format!("config: {e}")))?;
        std::fs::write(&config_path, contents)?;
        Ok(config_path)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("autocut").join("config.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid {}={}", key, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_parsing() {
        assert_eq!("1".parse::<Speed>().unwrap(), Speed::Factor(1.0));
        assert_eq!("2.5x".parse::<Speed>().unwrap(), Speed::Factor(2.5));
        assert_eq!("drop".parse::<Speed>().unwrap(), Speed::Drop);
        assert_eq!("Infinity".parse::<Speed>().unwrap(), Speed::Drop);
        assert!("0".parse::<Speed>().is_err());
        assert!("-2".parse::<Speed>().is_err());
        assert!("fast".parse::<Speed>().is_err());
    }

    #[test]
    fn test_speed_display_parses_back() {
        for speed in [Speed::Factor(1.5), Speed::Drop] {
            assert_eq!(speed.to_string().parse::<Speed>().unwrap(), speed);
        }
    }

    #[test]
    fn test_threshold_parsing() {
        assert_eq!("auto".parse::<Threshold>().unwrap(), Threshold::Auto);
        assert_eq!("-60".parse::<Threshold>().unwrap(), Threshold::Fixed(-60.0));
        assert_eq!(
            "-42.5dB".parse::<Threshold>().unwrap(),
            Threshold::Fixed(-42.5)
        );
        assert!("loud".parse::<Threshold>().is_err());
        assert!("NaN".parse::<Threshold>().is_err());
    }

    #[test]
    fn test_meter_parsing() {
        assert_eq!("volumedetect".parse::<Meter>().unwrap(), Meter::VolumeDetect);
        assert_eq!("FFMPEG".parse::<Meter>().unwrap(), Meter::VolumeDetect);
        assert_eq!("native".parse::<Meter>().unwrap(), Meter::Native);
        assert!("ebur128".parse::<Meter>().is_err());
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xlsx".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.extension(), "json");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cut.sounded_speed, Speed::Factor(1.0));
        assert_eq!(config.cut.silent_speed, Speed::Drop);
        assert_eq!(config.cut.threshold, Threshold::Fixed(-60.0));
        assert_eq!(config.cut.smoothing_radius_1, 2);
        assert_eq!(config.cut.smoothing_radius_2, 0);
        assert_eq!(config.concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_chunk_duration() {
        let mut config = CutConfig::default();
        config.chunk_duration = Some(0.0);
        assert!(config.validate().is_err());

        config.chunk_duration = Some(-1.0);
        assert!(config.validate().is_err());

        config.chunk_duration = Some(0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_both_drop() {
        let config = CutConfig {
            sounded_speed: Speed::Drop,
            silent_speed: Speed::Drop,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AutocutError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_factor() {
        let config = CutConfig {
            silent_speed: Speed::Factor(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config {
            cut: CutConfig {
                chunk_duration: Some(0.1),
                silent_speed: Speed::Factor(4.0),
                threshold: Threshold::Auto,
                ..Default::default()
            },
            meter: Meter::Native,
            ..Default::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("silent_speed = \"4x\""));
        assert!(text.contains("threshold = \"auto\""));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.cut, config.cut);
        assert_eq!(parsed.meter, Meter::Native);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str("silent_speed = \"3\"\n").unwrap();
        assert_eq!(parsed.cut.silent_speed, Speed::Factor(3.0));
        assert_eq!(parsed.cut.sounded_speed, Speed::Factor(1.0));
        assert_eq!(parsed.concurrency, 4);
    }
}
