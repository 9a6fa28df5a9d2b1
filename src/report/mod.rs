pub mod csv;
pub mod json;

use crate::analysis::Classification;
use crate::config::ReportFormat;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub trait ReportFormatter {
    fn format(&self, classification: &Classification, chunk_duration: f64) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: ReportFormat) -> Box<dyn ReportFormatter> {
    match format {
        ReportFormat::Csv => Box::new(csv::CsvReport),
        ReportFormat::Json => Box::new(json::JsonReport::default()),
    }
}

/// Report file placed next to the rendered video.
pub fn report_path(output: &Path, formatter: &dyn ReportFormatter) -> PathBuf {
    output.with_extension(formatter.extension())
}

/// Format the classification and write it beside `output`.
pub async fn write_report(
    formatter: &dyn ReportFormatter,
    classification: &Classification,
    chunk_duration: f64,
    output: &Path,
) -> Result<PathBuf> {
    let path = report_path(output, formatter);
    tokio::fs::write(&path, formatter.format(classification, chunk_duration)).await?;
    info!("Report written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ActivityClassifier;
    use crate::config::Threshold;

    #[test]
    fn test_report_path() {
        let csv = create_formatter(ReportFormat::Csv);
        let json = create_formatter(ReportFormat::Json);
        assert_eq!(
            report_path(Path::new("/videos/talk_cut.mp4"), csv.as_ref()),
            PathBuf::from("/videos/talk_cut.csv")
        );
        assert_eq!(
            report_path(Path::new("talk_cut.mp4"), json.as_ref()),
            PathBuf::from("talk_cut.json")
        );
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let classification =
            ActivityClassifier::new(0, 0).classify(&[-70.0, -10.0], Threshold::Fixed(-40.0));

        let formatter = create_formatter(ReportFormat::Csv);
        let path = write_report(formatter.as_ref(), &classification, 0.5, &output)
            .await
            .unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
