/// A value that can be fed through [`smooth`].
pub trait Level: Copy {
    fn level(self) -> f64;
}

impl Level for f64 {
    fn level(self) -> f64 {
        self
    }
}

impl Level for f32 {
    fn level(self) -> f64 {
        self as f64
    }
}

impl Level for bool {
    fn level(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// Parabolic window weight for a normalized position in `[-1, 1]`.
fn weight(position: f64) -> f64 {
    1.0 - position * position
}

/// Weighted moving average with a parabolic kernel of the given radius.
///
/// Each output is `Σ w·x / Σ w` over the window `[i - radius, i + radius]`
/// clipped to the sequence, so truncated windows at either end are not
/// biased toward zero and a constant input is returned unchanged.
/// A radius of 0 is the identity.
pub fn smooth<T: Level>(input: &[T], radius: usize) -> Vec<f64> {
    let n = input.len();
    if radius == 0 || n <= 1 {
        return input.iter().map(|v| v.level()).collect();
    }

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(radius);
            let end = i.saturating_add(radius).min(n - 1);
            let center = input[i].level();

            let mut total_weight = 0.0;
            let mut weighted_offset = 0.0;
            for (j, value) in input.iter().enumerate().take(end + 1).skip(start) {
                let position = (j as f64 - i as f64) / radius as f64;
                let w = weight(position);
                total_weight += w;
                // Offsets from the centre keep constant windows exact.
                weighted_offset += w * (value.level() - center);
            }

            center + weighted_offset / total_weight
        })
        .collect()
}
