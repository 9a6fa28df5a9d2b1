// JSON chunk report
use super::ReportFormatter;
use crate::analysis::{ChunkAnalysis, Classification};
use serde::Serialize;

#[derive(Default)]
pub struct JsonReport {
    pub source_file: Option<String>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: JsonMetadata,
    chunks: Vec<JsonChunk<'a>>,
}

#[derive(Serialize)]
struct JsonMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    chunk_duration: f64,
    threshold: f64,
    chunk_count: usize,
    sounded_count: usize,
}

#[derive(Serialize)]
struct JsonChunk<'a> {
    time: f64,
    #[serde(flatten)]
    analysis: &'a ChunkAnalysis,
}

impl ReportFormatter for JsonReport {
    fn format(&self, classification: &Classification, chunk_duration: f64) -> String {
        let output = JsonOutput {
            metadata: JsonMetadata {
                source_file: self.source_file.clone(),
                chunk_duration,
                threshold: classification.threshold,
                chunk_count: classification.chunks.len(),
                sounded_count: classification.sounded_count(),
            },
            chunks: classification
                .chunks
                .iter()
                .map(|c| JsonChunk {
                    time: c.start_time(chunk_duration),
                    analysis: c,
                })
                .collect(),
        };

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
