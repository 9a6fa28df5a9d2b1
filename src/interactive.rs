use crate::config::{Config, ReportFormat, Speed, Threshold};
use crate::pipeline::{derive_output_path, PipelineConfig};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "m4v", "ts"];

const SILENT_SPEEDS: &[(&str, Speed)] = &[
    ("Remove silence entirely", Speed::Drop),
    ("Speed up 8x", Speed::Factor(8.0)),
    ("Speed up 4x", Speed::Factor(4.0)),
    ("Speed up 2x", Speed::Factor(2.0)),
];

pub struct InteractiveResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pipeline_config: PipelineConfig,
}

pub fn run_interactive_wizard() -> anyhow::Result<InteractiveResult> {
    print_header();

    let mut config = Config::load().unwrap_or_default();

    // Step 1: Select source file
    let input = select_source_file()?;

    // Step 2: Silent segment speed
    config.cut.silent_speed = select_silent_speed(config.cut.silent_speed)?;

    // Step 3: Threshold
    config.cut.threshold = select_threshold(config.cut.threshold)?;

    // Step 4: Report (optional)
    let report = select_report()?;

    config.validate()?;

    let output = derive_output_path(&input);

    // Step 5: Confirm
    print_summary(&input, &output, &config, report);

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    if Confirm::new()
        .with_prompt("Save these settings as defaults?")
        .default(false)
        .interact()?
    {
        let path = config.save()?;
        println!(
            "{} Settings saved to {}",
            style("✓").green(),
            path.display()
        );
    }

    println!();

    let pipeline_config = PipelineConfig {
        report,
        ..PipelineConfig::from(&config)
    };

    Ok(InteractiveResult {
        input,
        output,
        pipeline_config,
    })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║          autocut - Silence Removal for Video      ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn prompt_existing_path() -> anyhow::Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Enter file path")
        .interact_text()?;
    let path = PathBuf::from(path.trim());
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn select_source_file() -> anyhow::Result<PathBuf> {
    println!("{}", style("Select source video:").bold());

    let files = scan_media_files(Path::new("."))?;

    if files.is_empty() {
        println!("  No video files found in current directory.\n");
        return prompt_existing_path();
    }

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a file")
        .items(&items)
        .default(0)
        .interact()?;

    if selection == files.len() {
        prompt_existing_path()
    } else {
        Ok(files[selection].clone())
    }
}

fn scan_media_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn select_silent_speed(current: Speed) -> anyhow::Result<Speed> {
    let mut items: Vec<String> = SILENT_SPEEDS
        .iter()
        .map(|(label, speed)| format!("{} ({})", label, speed))
        .collect();
    items.push("Custom factor...".to_string());

    let default = SILENT_SPEEDS
        .iter()
        .position(|(_, speed)| *speed == current)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("What should happen to silent parts?")
        .items(&items)
        .default(default)
        .interact()?;

    if selection < SILENT_SPEEDS.len() {
        return Ok(SILENT_SPEEDS[selection].1);
    }

    let value: String = Input::new()
        .with_prompt("Silent speed (e.g. 3, 1.5x or drop)")
        .validate_with(|input: &String| input.parse::<Speed>().map(|_| ()))
        .interact_text()?;
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}

fn select_threshold(current: Threshold) -> anyhow::Result<Threshold> {
    let value: String = Input::new()
        .with_prompt("Silence threshold in dB, or 'auto' for the average loudness")
        .default(current.to_string())
        .validate_with(|input: &String| input.parse::<Threshold>().map(|_| ()))
        .interact_text()?;
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}

fn select_report() -> anyhow::Result<Option<ReportFormat>> {
    let items = [
        "No report",
        "CSV - per-chunk loudness table",
        "JSON - per-chunk loudness with metadata",
    ];

    let selection = Select::new()
        .with_prompt("Write an analysis report?")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(match selection {
        1 => Some(ReportFormat::Csv),
        2 => Some(ReportFormat::Json),
        _ => None,
    })
}

fn print_summary(input: &Path, output: &Path, config: &Config, report: Option<ReportFormat>) {
    println!("\n{}", style("═══ Summary ═══").bold());
    println!("  Input:      {}", style(input.display()).cyan());
    println!("  Output:     {}", style(output.display()).cyan());
    println!("  Sounded:    {}", config.cut.sounded_speed);
    println!("  Silent:     {}", config.cut.silent_speed);
    println!("  Threshold:  {}", config.cut.threshold);
    if let Some(format) = report {
        println!("  Report:     {}", format.extension().to_uppercase());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_scan_media_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.MKV", "a.mp4", "notes.txt", "song.mp3"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("folder.mp4")).unwrap();

        let files = scan_media_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MKV"]);
    }
}
