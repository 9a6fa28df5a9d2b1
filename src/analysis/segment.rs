use serde::Serialize;

/// A maximal run of chunks sharing the same sounded decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// Start on the source timeline, in seconds.
    pub start: f64,
    /// End on the source timeline, in seconds.
    pub end: f64,
    pub sounded: bool,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Run-length encode per-chunk flags into contiguous segments.
///
/// Boundaries sit at `index * chunk_duration`; the last segment closes at
/// the start of the final chunk, so the segments cover
/// `[0, (n - 1) * chunk_duration]`. Zero-length runs are not emitted.
pub fn build_segments(flags: &[bool], chunk_duration: f64) -> Vec<Segment> {
    let mut segments = Vec::new();
    let Some(&first) = flags.first() else {
        return segments;
    };

    let last = flags.len() - 1;
    let time = |index: usize| index as f64 * chunk_duration;

    let mut run_start = 0;
    let mut run_flag = first;

    for (index, &flag) in flags.iter().enumerate().skip(1) {
        if flag != run_flag {
            segments.push(Segment {
                start: time(run_start),
                end: time(index),
                sounded: run_flag,
            });
            run_start = index;
            run_flag = flag;
        }
    }

    if run_start < last {
        segments.push(Segment {
            start: time(run_start),
            end: time(last),
            sounded: run_flag,
        });
    }

    segments
}

/// Total source time covered by the given segments.
pub fn total_duration(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::duration).sum()
}
