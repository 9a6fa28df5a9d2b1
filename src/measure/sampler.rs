use crate::audio::{content_hash, AudioChunk};
use crate::cache::VolumeCache;
use crate::error::{AutocutError, Result};
use crate::measure::LoudnessMeter;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Loudness assigned to chunks the meter reports as having no signal.
///
/// Below any threshold a real recording would use.
pub const SILENCE_FLOOR_DB: f64 = -150.0;

/// Statistics from the sampling process.
#[derive(Debug, Clone)]
pub struct SamplingStats {
    pub total_chunks: usize,
    /// Chunks that were measured rather than served from the cache.
    pub measured_chunks: usize,
    /// Chunks without a loudness statistic, recorded at the silence floor.
    pub silent_chunks: usize,
    pub total_time: Duration,
}

/// Measures every chunk concurrently and returns volumes in chunk order.
pub struct VolumeSampler {
    meter: Arc<dyn LoudnessMeter>,
    cache: Arc<VolumeCache>,
    concurrency: usize,
    show_progress: bool,
}

impl VolumeSampler {
    /// Create a sampler with the given meter and an in-memory cache.
    pub fn new(meter: Box<dyn LoudnessMeter>, concurrency: usize) -> Self {
        Self {
            meter: Arc::from(meter),
            cache: Arc::new(VolumeCache::in_memory()),
            concurrency: concurrency.max(1),
            show_progress: true,
        }
    }

    /// Use a shared (possibly persistent) cache.
    pub fn with_cache(mut self, cache: Arc<VolumeCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Measure all chunks. Any meter failure other than "no signal" aborts.
    pub async fn sample(&self, chunks: &[AudioChunk]) -> Result<(Vec<f64>, SamplingStats)> {
        let total_chunks = chunks.len();
        let start_time = Instant::now();
        let computed_before = self.cache.computed_count();

        info!(
            "Measuring {} chunks with {} concurrent workers using {}",
            total_chunks,
            self.concurrency,
            self.meter.name()
        );

        let progress_bar = if self.show_progress && total_chunks > 0 {
            let pb = ProgressBar::new(total_chunks as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut futures = FuturesUnordered::new();

        for chunk in chunks {
            let sem = semaphore.clone();
            let meter = self.meter.clone();
            let cache = self.cache.clone();
            let pb = progress_bar.clone();

            futures.push(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| AutocutError::Io(std::io::Error::other(e)))?;

                // Values are only comparable within one meter.
                let key = format!("{}:{}", meter.name(), content_hash(&chunk.path).await?);
                let volume = cache
                    .get_or_compute(&key, || async {
                        match meter.measure(&chunk.path).await {
                            Err(AutocutError::NoSignal(path)) => {
                                debug!("No signal in {}, using silence floor", path);
                                Ok(SILENCE_FLOOR_DB)
                            }
                            other => other,
                        }
                    })
                    .await;

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                match volume {
                    Ok(volume) => {
                        debug!("Chunk {}: {:.2} dB", chunk.index, volume);
                        Ok((chunk.index, volume))
                    }
                    Err(e) => {
                        warn!("Chunk {} failed: {}", chunk.index, e);
                        Err(e)
                    }
                }
            });
        }

        let mut results: Vec<(usize, f64)> = Vec::with_capacity(total_chunks);
        while let Some(result) = futures.next().await {
            results.push(result?);
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Measurement complete");
        }

        // Smoothing depends on order, so restore it before returning.
        results.sort_by_key(|(index, _)| *index);
        let volumes: Vec<f64> = results.into_iter().map(|(_, v)| v).collect();

        let stats = SamplingStats {
            total_chunks,
            measured_chunks: self.cache.computed_count() - computed_before,
            silent_chunks: volumes.iter().filter(|&&v| v <= SILENCE_FLOOR_DB).count(),
            total_time: start_time.elapsed(),
        };

        info!(
            "Measured {} chunks in {:.2}s ({} from cache, {} silent)",
            total_chunks,
            stats.total_time.as_secs_f64(),
            total_chunks.saturating_sub(stats.measured_chunks),
            stats.silent_chunks
        );

        Ok((volumes, stats))
    }
}
