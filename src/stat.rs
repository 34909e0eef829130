use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MetricStat – mean / standard deviation / median of one group
// ---------------------------------------------------------------------------

/// Summary statistics describing a group of metric values.
///
/// Values are stored exactly as given; nothing is validated, so NaN or a
/// negative deviation is kept as-is.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricStat {
    mean: f32,
    stddev: f32,
    median: f32,
}

impl MetricStat {
    pub fn new(mean: f32, stddev: f32, median: f32) -> Self {
        MetricStat {
            mean,
            stddev,
            median,
        }
    }

    /// Compute the statistics of `values`, or `None` when there are none.
    ///
    /// Accumulation runs in f64 (Welford) and each result is rounded to f32
    /// once. The deviation is the sample deviation (divide by n - 1) and is
    /// 0 for a single value. `values` is sorted in place for the median.
    pub fn from_values(values: &mut [f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;
        for (i, &v) in values.iter().enumerate() {
            let v = v as f64;
            let delta = v - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (v - mean);
        }
        let n = values.len();
        let stddev = if n > 1 {
            (m2 / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        values.sort_by(|a, b| a.total_cmp(b));
        let median = if n % 2 == 0 {
            (values[n / 2 - 1] as f64 + values[n / 2] as f64) / 2.0
        } else {
            values[n / 2] as f64
        };

        Some(MetricStat {
            mean: mean as f32,
            stddev: stddev as f32,
            median: median as f32,
        })
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn stddev(&self) -> f32 {
        self.stddev
    }

    pub fn median(&self) -> f32 {
        self.median
    }

    pub fn set_mean(&mut self, val: f32) {
        self.mean = val;
    }

    pub fn set_stddev(&mut self, val: f32) {
        self.stddev = val;
    }

    pub fn set_median(&mut self, val: f32) {
        self.median = val;
    }
}
