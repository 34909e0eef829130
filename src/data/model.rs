use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::run::RunInfo;

// ---------------------------------------------------------------------------
// Schema – metric families and their fields
// ---------------------------------------------------------------------------

/// Whether a field carries one value or one value per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    PerChannel,
}

/// A named numeric field in a family's record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
}

const fn scalar(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shape: FieldShape::Scalar,
    }
}

const fn per_channel(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shape: FieldShape::PerChannel,
    }
}

const EXTRACTION_FIELDS: &[FieldSpec] = &[per_channel("intensity"), per_channel("fwhm")];
const CORRECTED_INTENSITY_FIELDS: &[FieldSpec] = &[
    per_channel("corrected_intensity"),
    per_channel("called_intensity"),
    scalar("signal_to_noise"),
];
const ERROR_FIELDS: &[FieldSpec] = &[scalar("error_rate")];
const Q_FIELDS: &[FieldSpec] = &[scalar("percent_q20"), scalar("percent_q30")];

/// What the per-channel index of a family means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDimension {
    /// Imaging channel, named by the run info.
    Channel,
    /// Called base A, C, G, T.
    Base,
}

pub const BASE_NAMES: [&str; 4] = ["A", "C", "G", "T"];

/// A family of per-cycle metric records sharing one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Extraction,
    CorrectedIntensity,
    Error,
    Q,
}

impl MetricFamily {
    pub fn schema(self) -> &'static [FieldSpec] {
        match self {
            MetricFamily::Extraction => EXTRACTION_FIELDS,
            MetricFamily::CorrectedIntensity => CORRECTED_INTENSITY_FIELDS,
            MetricFamily::Error => ERROR_FIELDS,
            MetricFamily::Q => Q_FIELDS,
        }
    }

    /// Position of a named field in the schema.
    pub fn field_index(self, name: &str) -> Option<usize> {
        self.schema().iter().position(|f| f.name == name)
    }

    pub fn channel_dimension(self) -> ChannelDimension {
        match self {
            MetricFamily::CorrectedIntensity => ChannelDimension::Base,
            _ => ChannelDimension::Channel,
        }
    }

    /// Display name of a per-channel index in this family.
    pub fn channel_name(self, channel: usize, run: &RunInfo) -> String {
        match self.channel_dimension() {
            ChannelDimension::Channel => run.channel_name(channel),
            ChannelDimension::Base => BASE_NAMES
                .get(channel)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("Base {}", channel + 1)),
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricFamily::Extraction => "extraction",
            MetricFamily::CorrectedIntensity => "corrected intensity",
            MetricFamily::Error => "error",
            MetricFamily::Q => "q",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// MetricKind – the metric selector
// ---------------------------------------------------------------------------

/// A plottable metric: one field of one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Intensity,
    Fwhm,
    CorrectedIntensity,
    CalledIntensity,
    SignalToNoise,
    ErrorRate,
    PercentQ20,
    PercentQ30,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::Intensity,
        MetricKind::Fwhm,
        MetricKind::CorrectedIntensity,
        MetricKind::CalledIntensity,
        MetricKind::SignalToNoise,
        MetricKind::ErrorRate,
        MetricKind::PercentQ20,
        MetricKind::PercentQ30,
    ];

    /// The family whose records carry this metric.
    pub fn family(self) -> MetricFamily {
        match self {
            MetricKind::Intensity | MetricKind::Fwhm => MetricFamily::Extraction,
            MetricKind::CorrectedIntensity
            | MetricKind::CalledIntensity
            | MetricKind::SignalToNoise => MetricFamily::CorrectedIntensity,
            MetricKind::ErrorRate => MetricFamily::Error,
            MetricKind::PercentQ20 | MetricKind::PercentQ30 => MetricFamily::Q,
        }
    }

    /// Record field holding this metric.
    pub fn field(self) -> &'static str {
        match self {
            MetricKind::Intensity => "intensity",
            MetricKind::Fwhm => "fwhm",
            MetricKind::CorrectedIntensity => "corrected_intensity",
            MetricKind::CalledIntensity => "called_intensity",
            MetricKind::SignalToNoise => "signal_to_noise",
            MetricKind::ErrorRate => "error_rate",
            MetricKind::PercentQ20 => "percent_q20",
            MetricKind::PercentQ30 => "percent_q30",
        }
    }

    /// Whether the metric's field holds one value per channel.
    pub fn is_channel_resolved(self) -> bool {
        self.family()
            .schema()
            .iter()
            .any(|f| f.name == self.field() && f.shape == FieldShape::PerChannel)
    }

    /// Y-axis label.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Intensity => "Intensity",
            MetricKind::Fwhm => "FWHM",
            MetricKind::CorrectedIntensity => "Corrected Intensity",
            MetricKind::CalledIntensity => "Called Intensity",
            MetricKind::SignalToNoise => "Signal to Noise",
            MetricKind::ErrorRate => "Error Rate",
            MetricKind::PercentQ20 => "% >= Q20",
            MetricKind::PercentQ30 => "% >= Q30",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|m| m.field() == wanted)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One field value of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(f32),
    PerChannel(Vec<f32>),
}

impl FieldValue {
    /// Number of channels, or `None` for a scalar.
    pub fn channel_count(&self) -> Option<usize> {
        match self {
            FieldValue::Scalar(_) => None,
            FieldValue::PerChannel(values) => Some(values.len()),
        }
    }

    pub fn shape(&self) -> FieldShape {
        match self {
            FieldValue::Scalar(_) => FieldShape::Scalar,
            FieldValue::PerChannel(_) => FieldShape::PerChannel,
        }
    }
}

/// One observation for a (lane, tile, cycle), with values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub lane: u16,
    pub tile: u32,
    pub cycle: u16,
    pub fields: Vec<FieldValue>,
}

impl MetricRecord {
    pub fn new(lane: u16, tile: u32, cycle: u16, fields: Vec<FieldValue>) -> Self {
        MetricRecord {
            lane,
            tile,
            cycle,
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricSet – all records of one family
// ---------------------------------------------------------------------------

/// The records of one metric family for a run.
///
/// Duplicate (lane, tile, cycle) keys are kept as they are.
#[derive(Debug, Clone)]
pub struct MetricSet {
    family: MetricFamily,
    records: Vec<MetricRecord>,
}

impl MetricSet {
    pub fn new(family: MetricFamily, records: Vec<MetricRecord>) -> Self {
        MetricSet { family, records }
    }

    pub fn family(&self) -> MetricFamily {
        self.family
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn push(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Channel count of the first per-channel value in the set.
    pub fn channel_count(&self) -> Option<usize> {
        self.records
            .iter()
            .flat_map(|r| r.fields.iter())
            .find_map(FieldValue::channel_count)
    }

    pub fn lanes(&self) -> BTreeSet<u16> {
        self.records.iter().map(|r| r.lane).collect()
    }

    pub fn cycles(&self) -> BTreeSet<u16> {
        self.records.iter().map(|r| r.cycle).collect()
    }
}

// ---------------------------------------------------------------------------
// RunMetrics – the run topology plus every loaded family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub run: RunInfo,
    sets: BTreeMap<MetricFamily, MetricSet>,
}

impl RunMetrics {
    pub fn new(run: RunInfo) -> Self {
        RunMetrics {
            run,
            sets: BTreeMap::new(),
        }
    }

    /// Add a record set, replacing any earlier set of the same family.
    pub fn insert(&mut self, set: MetricSet) {
        self.sets.insert(set.family(), set);
    }

    pub fn get(&self, family: MetricFamily) -> Option<&MetricSet> {
        self.sets.get(&family)
    }

    pub fn families(&self) -> impl Iterator<Item = MetricFamily> + '_ {
        self.sets.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_metric_is_in_its_family_schema() {
        for metric in MetricKind::ALL {
            assert!(
                metric.family().field_index(metric.field()).is_some(),
                "{metric} missing from {}",
                metric.family()
            );
        }
    }

    #[test]
    fn channel_resolution_and_names() {
        assert!(MetricKind::Intensity.is_channel_resolved());
        assert!(MetricKind::CalledIntensity.is_channel_resolved());
        assert!(!MetricKind::SignalToNoise.is_channel_resolved());
        assert!(!MetricKind::PercentQ20.is_channel_resolved());

        let run = RunInfo::default();
        assert_eq!(MetricFamily::CorrectedIntensity.channel_name(3, &run), "T");
        assert_eq!(MetricFamily::Extraction.channel_name(0, &run), "Channel 1");
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("intensity".parse::<MetricKind>(), Ok(MetricKind::Intensity));
        assert_eq!(" Percent_Q30 ".parse::<MetricKind>(), Ok(MetricKind::PercentQ30));
        assert!("brightness".parse::<MetricKind>().is_err());
    }

    #[test]
    fn metric_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MetricKind::SignalToNoise).unwrap();
        assert_eq!(json, "\"signal_to_noise\"");
        let back: MetricKind = serde_json::from_str("\"error_rate\"").unwrap();
        assert_eq!(back, MetricKind::ErrorRate);
    }

    #[test]
    fn field_values_report_channels() {
        assert_eq!(FieldValue::Scalar(1.0).channel_count(), None);
        assert_eq!(FieldValue::PerChannel(vec![1.0, 2.0]).channel_count(), Some(2));
    }

    #[test]
    fn set_channel_count_skips_scalars() {
        let set = MetricSet::new(
            MetricFamily::CorrectedIntensity,
            vec![MetricRecord::new(
                1,
                1101,
                1,
                vec![
                    FieldValue::PerChannel(vec![1.0; 4]),
                    FieldValue::PerChannel(vec![1.0; 4]),
                    FieldValue::Scalar(3.0),
                ],
            )],
        );
        assert_eq!(set.channel_count(), Some(4));
        assert_eq!(set.lanes().into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn run_metrics_keyed_by_family() {
        let mut metrics = RunMetrics::default();
        metrics.insert(MetricSet::new(MetricFamily::Error, Vec::new()));
        assert!(metrics.get(MetricFamily::Error).is_some());
        assert!(metrics.get(MetricFamily::Q).is_none());
        assert_eq!(metrics.families().collect::<Vec<_>>(), vec![MetricFamily::Error]);
    }
}
