use serde::Serialize;
use tracing::debug;

use crate::config::Threshold;

use super::smooth::smooth;

/// Per-chunk values produced while classifying loudness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkAnalysis {
    pub index: usize,
    pub raw_volume: f64,
    pub smoothed_volume: f64,
    pub sounded: bool,
    pub smoothed_sounded: f64,
    pub final_sounded: bool,
}

impl ChunkAnalysis {
    /// Start of the chunk on the source timeline, in seconds.
    pub fn start_time(&self, chunk_duration: f64) -> f64 {
        self.index as f64 * chunk_duration
    }
}

/// Result of [`ActivityClassifier::classify`].
#[derive(Debug, Clone)]
pub struct Classification {
    /// Threshold actually applied to the smoothed volumes.
    pub threshold: f64,
    pub chunks: Vec<ChunkAnalysis>,
}

impl Classification {
    pub fn final_sounded(&self) -> Vec<bool> {
        self.chunks.iter().map(|c| c.final_sounded).collect()
    }

    pub fn sounded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.final_sounded).count()
    }
}

/// Turns per-chunk loudness into sounded/silent flags.
#[derive(Debug, Clone, Copy)]
pub struct ActivityClassifier {
    /// Radius for smoothing the loudness signal.
    pub volume_radius: usize,
    /// Radius for smoothing the binary sounded decision.
    pub sounded_radius: usize,
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self {
            volume_radius: 2,
            sounded_radius: 0,
        }
    }
}

impl ActivityClassifier {
    pub fn new(volume_radius: usize, sounded_radius: usize) -> Self {
        Self {
            volume_radius,
            sounded_radius,
        }
    }

    pub fn classify(&self, volumes: &[f64], threshold: Threshold) -> Classification {
        let smoothed_volumes = smooth(volumes, self.volume_radius);

        // The automatic threshold comes from the raw values, not the smoothed ones.
        let threshold = match threshold {
            Threshold::Fixed(db) => db,
            Threshold::Auto => mean(volumes),
        };
        debug!("Effective threshold: {:.2} dB", threshold);

        let sounded: Vec<bool> = smoothed_volumes.iter().map(|&v| v > threshold).collect();
        let smoothed_sounded = smooth(&sounded, self.sounded_radius);

        let chunks = volumes
            .iter()
            .enumerate()
            .map(|(index, &raw_volume)| ChunkAnalysis {
                index,
                raw_volume,
                smoothed_volume: smoothed_volumes[index],
                sounded: sounded[index],
                smoothed_sounded: smoothed_sounded[index],
                final_sounded: smoothed_sounded[index] > 0.5,
            })
            .collect();

        Classification { threshold, chunks }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_threshold_uses_raw_mean() {
        let classifier = ActivityClassifier::default();
        let result = classifier.classify(&[-70.0, -70.0, -10.0, -10.0], Threshold::Auto);

        assert_eq!(result.threshold, -40.0);
        assert_eq!(result.final_sounded(), vec![false, false, true, true]);
    }

    #[test]
    fn test_fixed_threshold() {
        let classifier = ActivityClassifier::new(0, 0);
        let result = classifier.classify(&[-80.0, -50.0, -61.0, -20.0], Threshold::Fixed(-60.0));

        assert_eq!(result.threshold, -60.0);
        assert_eq!(result.final_sounded(), vec![false, true, false, true]);
        assert_eq!(result.sounded_count(), 2);
    }

    #[test]
    fn test_equal_to_threshold_is_silent() {
        let classifier = ActivityClassifier::new(0, 0);
        let result = classifier.classify(&[-60.0, -59.0], Threshold::Fixed(-60.0));
        assert_eq!(result.final_sounded(), vec![false, true]);
    }

    #[test]
    fn test_second_pass_fills_single_chunk_gap() {
        let classifier = ActivityClassifier::new(0, 3);
        let volumes = vec![-20.0, -20.0, -80.0, -20.0, -20.0];
        let result = classifier.classify(&volumes, Threshold::Fixed(-60.0));

        assert!(!result.chunks[2].sounded);
        assert!(result.chunks[2].final_sounded);
    }

    #[test]
    fn test_exact_half_resolves_to_silent() {
        // Radius 4 weights by distance are 1, 15/16, 12/16, 7/16, 0, so the
        // sounded neighbours at distances 1, 1 and 2 carry exactly half.
        let classifier = ActivityClassifier::new(0, 4);
        let pattern = [false, false, true, true, false, true, false, false, false];
        let volumes: Vec<f64> = pattern
            .iter()
            .map(|&s| if s { -20.0 } else { -80.0 })
            .collect();
        let result = classifier.classify(&volumes, Threshold::Fixed(-60.0));

        assert_eq!(result.chunks[4].smoothed_sounded, 0.5);
        assert!(!result.chunks[4].final_sounded);
    }

    #[test]
    fn test_chunk_columns_are_filled() {
        let classifier = ActivityClassifier::default();
        let volumes = vec![-30.0, -90.0, -30.0];
        let result = classifier.classify(&volumes, Threshold::Fixed(-50.0));

        assert_eq!(result.chunks.len(), 3);
        for (i, chunk) in result.chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.raw_volume, volumes[i]);
        }
        assert_eq!(result.chunks[2].start_time(0.5), 1.0);
    }

    #[test]
    fn test_empty_input() {
        let result = ActivityClassifier::default().classify(&[], Threshold::Auto);
        assert!(result.chunks.is_empty());
    }
}
