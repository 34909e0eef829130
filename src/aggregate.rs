use std::collections::{BTreeMap, BTreeSet};

use crate::data::filter::{FilterOptions, RecordKey};
use crate::data::model::{FieldShape, FieldValue, MetricKind, MetricSet};
use crate::error::PlotError;
use crate::run::RunInfo;
use crate::stat::MetricStat;

// ---------------------------------------------------------------------------
// Group keys and the aggregation result
// ---------------------------------------------------------------------------

/// Group key; orders by cycle, then channel. Scalar metrics use channel 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub cycle: u16,
    pub channel: usize,
}

/// Statistics per non-empty (cycle, channel) group of one metric.
#[derive(Debug, Clone)]
pub struct CycleStatistics {
    metric: MetricKind,
    channel_resolved: bool,
    groups: BTreeMap<GroupKey, MetricStat>,
}

impl CycleStatistics {
    /// An empty result for `metric`.
    pub fn empty(metric: MetricKind) -> Self {
        CycleStatistics {
            metric,
            channel_resolved: metric.is_channel_resolved(),
            groups: BTreeMap::new(),
        }
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Whether groups are split by channel.
    pub fn channel_resolved(&self) -> bool {
        self.channel_resolved
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no record matched the filters.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, cycle: u16, channel: usize) -> Option<&MetricStat> {
        self.groups.get(&GroupKey { cycle, channel })
    }

    /// Groups in ascending (cycle, channel) order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &MetricStat)> {
        self.groups.iter()
    }

    pub fn cycles(&self) -> BTreeSet<u16> {
        self.groups.keys().map(|k| k.cycle).collect()
    }

    pub fn channels(&self) -> BTreeSet<usize> {
        self.groups.keys().map(|k| k.channel).collect()
    }
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

/// Group the values of `metric` by (cycle, channel) and reduce each group
/// to a [`MetricStat`].
///
/// Records failing `options` are skipped. No matching record gives an empty
/// result, not an error.
pub fn aggregate(
    set: &MetricSet,
    run: &RunInfo,
    metric: MetricKind,
    options: &FilterOptions,
) -> Result<CycleStatistics, PlotError> {
    let family = set.family();
    let schema = family.schema();
    let field = family
        .field_index(metric.field())
        .ok_or(PlotError::InvalidMetricSelector { metric, family })?;
    options.validate(run)?;

    let channel_resolved = schema[field].shape == FieldShape::PerChannel;
    let expected_channels = set.channel_count();
    let mismatch = |index: usize, reason: String| PlotError::SchemaMismatch {
        family,
        index,
        reason,
    };

    let mut groups: BTreeMap<GroupKey, Vec<f32>> = BTreeMap::new();
    for (index, record) in set.records().iter().enumerate() {
        if record.fields.len() != schema.len() {
            return Err(mismatch(
                index,
                format!("{} fields, expected {}", record.fields.len(), schema.len()),
            ));
        }
        for (value, spec) in record.fields.iter().zip(schema) {
            if value.shape() != spec.shape {
                return Err(mismatch(index, format!("field '{}' has the wrong shape", spec.name)));
            }
            if let Some(count) = value.channel_count() {
                if Some(count) != expected_channels {
                    return Err(mismatch(
                        index,
                        format!(
                            "field '{}' has {count} channels, expected {}",
                            spec.name,
                            expected_channels.unwrap_or(0)
                        ),
                    ));
                }
            }
        }

        let key = RecordKey::resolve(run, record.lane, record.tile, record.cycle);
        if !options.matches(&key) {
            continue;
        }
        match &record.fields[field] {
            FieldValue::Scalar(v) => groups
                .entry(GroupKey {
                    cycle: record.cycle,
                    channel: 0,
                })
                .or_default()
                .push(*v),
            FieldValue::PerChannel(values) => {
                for (channel, v) in values.iter().enumerate() {
                    if !options.matches(&key.with_channel(channel)) {
                        continue;
                    }
                    groups
                        .entry(GroupKey {
                            cycle: record.cycle,
                            channel,
                        })
                        .or_default()
                        .push(*v);
                }
            }
        }
    }

    let groups: BTreeMap<GroupKey, MetricStat> = groups
        .into_iter()
        .filter_map(|(key, mut values)| MetricStat::from_values(&mut values).map(|s| (key, s)))
        .collect();

    if groups.is_empty() {
        log::debug!("no {metric} values matched {options:?}");
    } else {
        log::debug!(
            "aggregated {} records into {} {metric} groups",
            set.len(),
            groups.len()
        );
    }

    Ok(CycleStatistics {
        metric,
        channel_resolved,
        groups,
    })
}
