use std::ops::Index;

use serde::Serialize;

use crate::aggregate::{aggregate, CycleStatistics};
use crate::color::generate_palette;
use crate::data::filter::FilterOptions;
use crate::data::model::{MetricKind, RunMetrics};
use crate::error::PlotError;
use crate::run::RunInfo;
use crate::stat::MetricStat;

// ---------------------------------------------------------------------------
// Plot data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    pub label: String,
    pub min: f32,
    pub max: f32,
}

/// A point carrying the full statistic of one cycle, for error-bar or
/// candlestick rendering.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CandleStickPoint {
    /// Cycle number (1-based).
    pub x: f32,
    #[serde(flatten)]
    pub stat: MetricStat,
}

impl CandleStickPoint {
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Mean minus one standard deviation.
    pub fn lower(&self) -> f32 {
        self.stat.mean() - self.stat.stddev()
    }

    /// Mean plus one standard deviation.
    pub fn upper(&self) -> f32 {
        self.stat.mean() + self.stat.stddev()
    }
}

/// One line of the plot: a channel, or the whole metric when it has none.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    /// `#rrggbb`
    pub color: String,
    pub points: Vec<CandleStickPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Index<usize> for Series {
    type Output = CandleStickPoint;

    fn index(&self, index: usize) -> &CandleStickPoint {
        &self.points[index]
    }
}

/// Axis-labelled series, ready to draw.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlotDataset {
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub series: Vec<Series>,
}

impl PlotDataset {
    /// Number of series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when nothing matched the filters.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Index<usize> for PlotDataset {
    type Output = Series;

    fn index(&self, index: usize) -> &Series {
        &self.series[index]
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Turn per-cycle statistics into a plot dataset.
///
/// One series per channel present (one series for scalar metrics), each
/// point at its cycle number. The x-axis runs from the first to the last
/// cycle with data, offset to start at zero; the y-axis from 0 (or the
/// lowest negative mean) to the highest mean.
pub fn assemble(
    stats: &CycleStatistics,
    metric: MetricKind,
    options: &FilterOptions,
    run: &RunInfo,
) -> Result<PlotDataset, PlotError> {
    if stats.metric() != metric {
        return Err(PlotError::InvalidMetricSelector {
            metric,
            family: stats.metric().family(),
        });
    }

    let mut data = PlotDataset {
        title: options.title(metric, stats.channel_resolved(), run),
        x_axis: Axis {
            label: "Cycle".to_string(),
            ..Default::default()
        },
        y_axis: Axis {
            label: metric.label().to_string(),
            ..Default::default()
        },
        series: Vec::new(),
    };
    if stats.is_empty() {
        return Ok(data);
    }

    let channels = stats.channels();
    let colors = generate_palette(channels.len());
    for (channel, color) in channels.into_iter().zip(colors) {
        let name = if stats.channel_resolved() {
            metric.family().channel_name(channel, run)
        } else {
            metric.label().to_string()
        };
        let points = stats
            .iter()
            .filter(|(key, _)| key.channel == channel)
            .map(|(key, stat)| CandleStickPoint {
                x: key.cycle as f32,
                stat: *stat,
            })
            .collect();
        data.series.push(Series {
            name,
            color,
            points,
        });
    }

    let cycles = stats.cycles();
    if let (Some(first), Some(last)) = (cycles.first(), cycles.last()) {
        data.x_axis.min = first.saturating_sub(1) as f32;
        data.x_axis.max = last.saturating_sub(1) as f32;
    }

    // Non-finite means stay in the series but never set the range.
    let means = data
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.stat.mean()))
        .filter(|m| m.is_finite());
    let (lo, hi) = means.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), m| {
        (lo.min(m), hi.max(m))
    });
    if hi.is_finite() {
        data.y_axis.max = hi;
    }
    if lo.is_finite() && lo < 0.0 {
        data.y_axis.min = lo;
    }

    log::debug!(
        "assembled {} series over cycles {}..={}",
        data.series.len(),
        data.x_axis.min + 1.0,
        data.x_axis.max + 1.0
    );
    Ok(data)
}

/// Aggregate and assemble `metric` from the run's loaded record sets.
///
/// A run without records of the metric's family yields an empty dataset.
pub fn plot_by_cycle(
    metrics: &RunMetrics,
    metric: MetricKind,
    options: &FilterOptions,
) -> Result<PlotDataset, PlotError> {
    let stats = match metrics.get(metric.family()) {
        Some(set) => aggregate(set, &metrics.run, metric, options)?,
        None => {
            log::warn!("no {} records loaded", metric.family());
            options.validate(&metrics.run)?;
            CycleStatistics::empty(metric)
        }
    };
    assemble(&stats, metric, options, &metrics.run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FieldValue, MetricFamily, MetricRecord, MetricSet};
    use crate::run::{FlowcellLayout, InstrumentType, ReadInfo};

    fn run() -> RunInfo {
        RunInfo::new(
            "",
            FlowcellLayout::new(2, 2, 2, 16),
            vec![ReadInfo::new(1, 1, 26), ReadInfo::new(2, 27, 76)],
        )
        .with_legacy_channels(InstrumentType::NextSeq)
    }

    fn q_metrics() -> RunMetrics {
        let mut metrics = RunMetrics::new(run());
        metrics.insert(MetricSet::new(
            MetricFamily::Q,
            vec![
                MetricRecord::new(1, 1101, 5, vec![FieldValue::Scalar(90.0), FieldValue::Scalar(80.0)]),
                MetricRecord::new(1, 1102, 5, vec![FieldValue::Scalar(92.0), FieldValue::Scalar(84.0)]),
                MetricRecord::new(1, 1101, 3, vec![FieldValue::Scalar(99.0), FieldValue::Scalar(95.0)]),
            ],
        ));
        metrics
    }

    #[test]
    fn scalar_metric_gives_one_series() {
        let data = plot_by_cycle(&q_metrics(), MetricKind::PercentQ30, &FilterOptions::default())
            .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.title, "All Lanes All Surfaces");
        assert_eq!(data[0].name, "% >= Q30");
        assert_eq!(data.y_axis.label, "% >= Q30");
        assert_eq!(data[0].len(), 2);
        assert_eq!(data[0][0].x(), 3.0);
        assert_eq!(data[0][1].x(), 5.0);
        assert_eq!(data.x_axis.min, 2.0);
        assert_eq!(data.x_axis.max, 4.0);
        assert_eq!(data.y_axis.min, 0.0);
        assert_eq!(data.y_axis.max, 95.0);
    }

    #[test]
    fn channel_series_use_run_channel_names() {
        let mut metrics = RunMetrics::new(run());
        metrics.insert(MetricSet::new(
            MetricFamily::Extraction,
            vec![
                MetricRecord::new(
                    1,
                    1101,
                    1,
                    vec![FieldValue::PerChannel(vec![100.0, 50.0]), FieldValue::PerChannel(vec![2.0, 2.5])],
                ),
                MetricRecord::new(
                    1,
                    1101,
                    2,
                    vec![FieldValue::PerChannel(vec![90.0, 45.0]), FieldValue::PerChannel(vec![2.1, 2.6])],
                ),
            ],
        ));
        let data = plot_by_cycle(&metrics, MetricKind::Fwhm, &FilterOptions::default()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].name, "Red");
        assert_eq!(data[1].name, "Green");
        assert_ne!(data[0].color, data[1].color);
        assert!((data.y_axis.max - 2.6).abs() < 1e-6);

        let green = plot_by_cycle(&metrics, MetricKind::Intensity, &FilterOptions::default().channel(1))
            .unwrap();
        assert_eq!(green.len(), 1);
        assert_eq!(green.title, "All Lanes Green All Surfaces");
        assert_eq!(green.y_axis.max, 50.0);
    }

    #[test]
    fn negative_means_extend_the_y_axis() {
        let mut metrics = RunMetrics::new(run());
        metrics.insert(MetricSet::new(
            MetricFamily::Error,
            vec![
                MetricRecord::new(1, 1101, 1, vec![FieldValue::Scalar(-2.0)]),
                MetricRecord::new(1, 1101, 2, vec![FieldValue::Scalar(3.0)]),
            ],
        ));
        let data = plot_by_cycle(&metrics, MetricKind::ErrorRate, &FilterOptions::default()).unwrap();
        assert_eq!(data.y_axis.min, -2.0);
        assert_eq!(data.y_axis.max, 3.0);
    }

    #[test]
    fn infinite_means_do_not_hide_the_y_range() {
        let mut metrics = RunMetrics::new(run());
        metrics.insert(MetricSet::new(
            MetricFamily::Error,
            vec![
                MetricRecord::new(1, 1101, 1, vec![FieldValue::Scalar(f32::INFINITY)]),
                MetricRecord::new(1, 1101, 2, vec![FieldValue::Scalar(5.0)]),
                MetricRecord::new(1, 1101, 3, vec![FieldValue::Scalar(f32::NEG_INFINITY)]),
            ],
        ));
        let data = plot_by_cycle(&metrics, MetricKind::ErrorRate, &FilterOptions::default()).unwrap();
        assert_eq!(data[0].len(), 3);
        assert!(data[0][0].stat.mean().is_infinite());
        assert_eq!(data.y_axis.max, 5.0);
        assert_eq!(data.y_axis.min, 0.0);
    }

    #[test]
    fn missing_family_is_empty() {
        let data = plot_by_cycle(&q_metrics(), MetricKind::Intensity, &FilterOptions::default().lane(1))
            .unwrap();
        assert!(data.is_empty());
        assert_eq!(data.title, "Lane 1 All Channels All Surfaces");
        assert_eq!(data.x_axis.max, 0.0);
        assert_eq!(data.y_axis.max, 0.0);
    }

    #[test]
    fn mismatched_statistics_are_rejected() {
        let stats = CycleStatistics::empty(MetricKind::PercentQ20);
        let err = assemble(&stats, MetricKind::Intensity, &FilterOptions::default(), &run()).unwrap_err();
        assert!(matches!(err, PlotError::InvalidMetricSelector { .. }));
    }

    #[test]
    fn candle_stick_bounds() {
        let point = CandleStickPoint {
            x: 1.0,
            stat: MetricStat::new(10.0, 2.0, 9.0),
        };
        assert_eq!(point.lower(), 8.0);
        assert_eq!(point.upper(), 12.0);
    }

    #[test]
    fn dataset_serializes_flat_points() {
        let data = plot_by_cycle(&q_metrics(), MetricKind::PercentQ20, &FilterOptions::default())
            .unwrap();
        let json = serde_json::to_value(&data).unwrap();
        let point = &json["series"][0]["points"][0];
        assert_eq!(point["x"], 3.0);
        assert_eq!(point["mean"], 99.0);
        assert_eq!(json["x_axis"]["label"], "Cycle");
    }
}
