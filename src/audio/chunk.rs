use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AutocutError, Result};

use super::AudioChunk;

/// List the WAV chunk files in `dir` in timeline order.
///
/// Chunk files are zero-padded, so name order equals timeline order.
pub fn list_chunks(dir: &Path) -> Result<Vec<AudioChunk>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        if path.is_file() && is_wav {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} chunk files in {}", paths.len(), dir.display());

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| AudioChunk { path, index })
        .collect())
}

/// SHA-256 of a file's contents as lowercase hex.
pub async fn content_hash(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Clean up chunk files.
pub fn cleanup_chunks(chunks: &[AudioChunk]) -> Result<()> {
    for chunk in chunks {
        if chunk.path.exists() {
            std::fs::remove_file(&chunk.path).map_err(|e| {
                AutocutError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to remove chunk file {}: {e}", chunk.path.display()),
                ))
            })?;
        }
    }
    Ok(())
}
