use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutocutError {
    #[error("No loudness statistic for {0}")]
    NoSignal(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: &'static str, message: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse {0}")]
    Parse(String),

    #[error("Nothing to render: {0}")]
    NothingToRender(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AutocutError {
    pub fn ffmpeg(message: impl Into<String>) -> Self {
        AutocutError::ExternalTool {
            tool: "FFmpeg",
            message: message.into(),
        }
    }

    pub fn ffprobe(message: impl Into<String>) -> Self {
        AutocutError::ExternalTool {
            tool: "FFprobe",
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutocutError>;
