// CSV chunk report
use super::ReportFormatter;
use crate::analysis::Classification;

pub const HEADER: &str = "index,time,raw_volume,smoothed_volume,sounded,smoothed_sounded,final_sounded";

pub struct CsvReport;

impl ReportFormatter for CsvReport {
    fn format(&self, classification: &Classification, chunk_duration: f64) -> String {
        let mut out = String::with_capacity(64 * (classification.chunks.len() + 1));
        out.push_str(HEADER);
        out.push('\n');

        for chunk in &classification.chunks {
            out.push_str(&format!(
                "{},{:.3},{:.2},{:.2},{},{:.3},{}\n",
                chunk.index,
                chunk.start_time(chunk_duration),
                chunk.raw_volume,
                chunk.smoothed_volume,
                chunk.sounded as u8,
                chunk.smoothed_sounded,
                chunk.final_sounded as u8
            ));
        }

        out
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}
