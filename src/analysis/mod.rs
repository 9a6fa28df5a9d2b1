pub mod classify;
pub mod segment;
pub mod smooth;
pub mod speed;

pub use classify::{ActivityClassifier, ChunkAnalysis, Classification};
pub use segment::{build_segments, total_duration, Segment};
pub use smooth::{smooth, Level};
pub use speed::{plan_speed, plan_speeds, render_jobs, rendered_total, RenderJob, SpeedPlan};
