//! Simple descriptive statistics.

use std::cmp::Ordering::{self, Equal, Greater, Less};

fn local_cmp(x: f64, y: f64) -> Ordering {
    // arbitrarily decide that NaNs are larger than everything.
    if y.is_nan() {
        Less
    } else if x.is_nan() {
        Greater
    } else if x < y {
        Less
    } else if x == y {
        Equal
    } else {
        Greater
    }
}

// Extract the value representing the `pct` percentile of a sorted sample-set, using linear
// interpolation.
fn percentile_of_sorted(sorted_samples: &[f64], pct: f64) -> f64 {
    assert!(!sorted_samples.is_empty());
    assert!(pct >= 0.0 && pct <= 100.0);
    if sorted_samples.len() == 1 {
        return sorted_samples[0];
    }
    if pct == 100.0 {
        return sorted_samples[sorted_samples.len() - 1];
    }
    let length = (sorted_samples.len() - 1) as f64;
    let rank = (pct / 100.0) * length;
    let lrank = rank.floor();
    let d = rank - lrank;
    let n = lrank as usize;
    let lo = sorted_samples[n];
    let hi = sorted_samples[n + 1];
    lo + (hi - lo) * d
}

/// Descriptive statistics on a sample of values.
///
/// Variance is the population variance (divide by `N`).  All functions return `NaN` for empty
/// input.
pub trait Stats {
    /// Arithmetic mean.
    fn mean(&self) -> f64;

    /// Population variance.
    fn variance(&self) -> f64;

    /// Population standard deviation.
    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Linearly interpolated `pct` percentile, `pct` in `[0, 100]`.
    fn percentile(&self, pct: f64) -> f64;

    /// Median; the two middle values are averaged for inputs of even size.
    fn median(&self) -> f64 {
        self.percentile(50.0)
    }
}

impl Stats for [f64] {
    fn mean(&self) -> f64 {
        let mut acc = MeanVar::new();
        self.iter().for_each(|x| acc.push(*x));
        acc.mean()
    }

    fn variance(&self) -> f64 {
        let mut acc = MeanVar::new();
        self.iter().for_each(|x| acc.push(*x));
        acc.variance()
    }

    fn percentile(&self, pct: f64) -> f64 {
        if self.is_empty() {
            return ::std::f64::NAN;
        }
        let mut tmp = self.to_vec();
        tmp.sort_by(|x, y| local_cmp(*x, *y));
        percentile_of_sorted(&tmp, pct)
    }
}

/// Streaming accumulator for mean and population variance (Welford's algorithm).
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanVar {
    count: usize,
    mean: f64,
    m2: f64,
}

impl MeanVar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Number of values seen so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            ::std::f64::NAN
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            ::std::f64::NAN
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
