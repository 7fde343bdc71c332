use crate::error::{PlotError, Result};

/// Maps a data interval onto a pixel interval. The range may be reversed
/// (e.g. y grows downward on screen).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        if span == 0.0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / span * (r1 - r0)
    }
}

/// Min/max of the pooled values. `None` when there are no finite values.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}

/// Domain for one axis of a panel. A degenerate extent is widened by one on
/// each side so the scale stays invertible.
pub fn compute_domain(axis: &str, values: impl IntoIterator<Item = f64>) -> Result<(f64, f64)> {
    let (min, max) = extent(values).ok_or_else(|| {
        PlotError::Render(format!("No values to compute a domain for the {} axis", axis))
    })?;
    Ok(pad_degenerate(min, max))
}

fn pad_degenerate(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

/// `count` evenly spaced positions from `start` to `end` inclusive.
pub fn ticks(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
