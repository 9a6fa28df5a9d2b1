pub mod analysis;
pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod interactive;
pub mod measure;
pub mod pipeline;
pub mod render;
pub mod report;

pub use config::{Config, CutConfig, Speed, Threshold};
pub use error::{AutocutError, Result};
pub use pipeline::{
    print_summary, remove_silence, remove_silence_with_cancel, PipelineConfig, PipelineResult,
    PipelineStats,
};
