use serde::Serialize;

use crate::config::Speed;

use super::segment::Segment;

/// Speed decision for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPlan {
    pub segment: Segment,
    pub speed: Speed,
    /// Output duration in seconds; zero for dropped segments.
    pub rendered_duration: f64,
}

impl SpeedPlan {
    pub fn skip(&self) -> bool {
        self.speed.is_drop()
    }
}

/// One slice of the source to be re-timed and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderJob {
    /// Position in the output; dense and ascending.
    pub index: usize,
    pub source_start: f64,
    pub source_duration: f64,
    pub rendered_duration: f64,
    pub factor: f64,
}

pub fn plan_speed(segment: Segment, sounded_speed: Speed, silent_speed: Speed) -> SpeedPlan {
    let speed = if segment.sounded {
        sounded_speed
    } else {
        silent_speed
    };

    let rendered_duration = match speed {
        Speed::Factor(factor) => segment.duration() / factor,
        Speed::Drop => 0.0,
    };

    SpeedPlan {
        segment,
        speed,
        rendered_duration,
    }
}

pub fn plan_speeds(
    segments: &[Segment],
    sounded_speed: Speed,
    silent_speed: Speed,
) -> Vec<SpeedPlan> {
    segments
        .iter()
        .map(|&s| plan_speed(s, sounded_speed, silent_speed))
        .collect()
}

/// Render jobs for every segment that is not dropped, in timeline order.
pub fn render_jobs(plans: &[SpeedPlan]) -> Vec<RenderJob> {
    plans
        .iter()
        .filter_map(|plan| plan.speed.factor().map(|factor| (plan, factor)))
        .enumerate()
        .map(|(index, (plan, factor))| RenderJob {
            index,
            source_start: plan.segment.start,
            source_duration: plan.segment.duration(),
            rendered_duration: plan.rendered_duration,
            factor,
        })
        .collect()
}

/// Total output duration of the plans, in seconds.
pub fn rendered_total(plans: &[SpeedPlan]) -> f64 {
    plans.iter().map(|p| p.rendered_duration).sum()
}
