pub mod chunk;
pub mod extract;

pub use chunk::{cleanup_chunks, content_hash, list_chunks};
pub use extract::{
    check_ffmpeg, check_ffprobe, extract_audio_chunks, get_frame_rate, get_media_duration,
    probe_media, run_ffmpeg, transcode_to_mp4,
};

use std::path::PathBuf;
use std::time::Duration;

/// Metadata about the source video.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration: Duration,
    /// Frames per second of the first video stream, if there is one.
    pub frame_rate: Option<f64>,
}

/// A fixed-duration slice of the source audio, written to its own file.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub path: PathBuf,
    pub index: usize,
}

impl AudioChunk {
    /// Start of this chunk on the source timeline, in seconds.
    pub fn start_time(&self, chunk_duration: f64) -> f64 {
        self.index as f64 * chunk_duration
    }
}
