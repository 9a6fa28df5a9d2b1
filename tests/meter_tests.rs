//! Loudness sampling tests with real WAV chunks and mock meters
//!
//! These tests run the sampler, cache and classifier together without
//! FFmpeg.

use async_trait::async_trait;
use autocut::analysis::{build_segments, ActivityClassifier};
use autocut::audio::{list_chunks, AudioChunk};
use autocut::cache::VolumeCache;
use autocut::config::Threshold;
use autocut::error::{AutocutError, Result};
use autocut::measure::{LoudnessMeter, NativeMeter, VolumeSampler, SILENCE_FLOOR_DB};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn write_wav(path: &Path, amplitude: i16, len: usize) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..len {
        let sample = if i % 2 == 0 { amplitude } else { -amplitude };
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Writes `%06d.wav` chunks with the given amplitudes and lists them back.
fn write_chunks(dir: &Path, amplitudes: &[i16]) -> Vec<AudioChunk> {
    for (i, &amplitude) in amplitudes.iter().enumerate() {
        write_wav(&dir.join(format!("{:06}.wav", i)), amplitude, 400);
    }
    list_chunks(dir).unwrap()
}

// ============================================================================
// Native Meter Tests
// ============================================================================

mod native_meter_tests {
    use super::*;

    #[tokio::test]
    async fn test_native_sampling_and_classification() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = write_chunks(dir.path(), &[16384, 16384, 0, 0, 0, 16384]);

        let sampler = VolumeSampler::new(Box::new(NativeMeter), 3).with_progress(false);
        let (volumes, stats) = sampler.sample(&chunks).await.unwrap();

        assert_eq!(volumes.len(), 6);
        assert!((volumes[0] - (-6.0206)).abs() < 1e-3);
        assert_eq!(volumes[2], SILENCE_FLOOR_DB);
        assert_eq!(stats.silent_chunks, 3);
        // Identical chunk bytes are measured once.
        assert_eq!(stats.measured_chunks, 2);

        let classification =
            ActivityClassifier::new(0, 0).classify(&volumes, Threshold::Fixed(-60.0));
        assert_eq!(
            classification.final_sounded(),
            vec![true, true, false, false, false, true]
        );

        let segments = build_segments(&classification.final_sounded(), 0.05);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].sounded);
        assert!(!segments[1].sounded);
        assert!((segments[1].end - 0.25).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_persistent_cache_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let sounds = dir.path().join("sounds");
        std::fs::create_dir(&sounds).unwrap();
        let chunks = write_chunks(&sounds, &[8000, 1000, 0]);
        let cache_path = dir.path().join("volumes.json");

        let first_cache = Arc::new(VolumeCache::open(&cache_path));
        let first = VolumeSampler::new(Box::new(NativeMeter), 2)
            .with_cache(first_cache.clone())
            .with_progress(false);
        let (first_volumes, first_stats) = first.sample(&chunks).await.unwrap();
        first_cache.persist().unwrap();
        assert_eq!(first_stats.measured_chunks, 3);

        let second = VolumeSampler::new(Box::new(NativeMeter), 2)
            .with_cache(Arc::new(VolumeCache::open(&cache_path)))
            .with_progress(false);
        let (second_volumes, second_stats) = second.sample(&chunks).await.unwrap();

        assert_eq!(second_stats.measured_chunks, 0);
        assert_eq!(first_volumes, second_volumes);
    }
}

// ============================================================================
// Mock Meter Tests
// ============================================================================

mod mock_meter_tests {
    use super::*;

    /// Fails once on every path, then succeeds.
    struct FlakyMeter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LoudnessMeter for FlakyMeter {
        async fn measure(&self, _path: &Path) -> Result<f64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AutocutError::ffmpeg("exit status 1"))
            } else {
                Ok(-30.0)
            }
        }

        fn name(&self) -> &'static str {
            "Flaky"
        }
    }

    #[tokio::test]
    async fn test_failure_aborts_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = write_chunks(dir.path(), &[5000]);
        let cache = Arc::new(VolumeCache::in_memory());
        let meter = Arc::new(FlakyMeter {
            calls: AtomicUsize::new(0),
        });

        struct Shared(Arc<FlakyMeter>);

        #[async_trait]
        impl LoudnessMeter for Shared {
            async fn measure(&self, path: &Path) -> Result<f64> {
                self.0.measure(path).await
            }
            fn name(&self) -> &'static str {
                "Shared flaky"
            }
        }

        let sampler = VolumeSampler::new(Box::new(Shared(meter.clone())), 1)
            .with_cache(cache.clone())
            .with_progress(false);

        let first = sampler.sample(&chunks).await;
        assert!(matches!(first, Err(AutocutError::ExternalTool { .. })));
        assert!(cache.is_empty());

        let (volumes, _) = sampler.sample(&chunks).await.unwrap();
        assert_eq!(volumes, vec![-30.0]);
        assert_eq!(meter.calls.load(Ordering::SeqCst), 2);
    }
}
