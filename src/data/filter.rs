use serde::{Deserialize, Serialize};

use crate::data::model::{ChannelDimension, MetricFamily, MetricKind};
use crate::error::PlotError;
use crate::run::{RunInfo, TileNaming};

// ---------------------------------------------------------------------------
// RecordKey – what a filter looks at
// ---------------------------------------------------------------------------

/// Location of one value, resolved against the run topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey {
    pub lane: u16,
    pub tile: u32,
    pub surface: u8,
    pub cycle: u16,
    /// Read containing the cycle, if the run declares one.
    pub read: Option<u16>,
    /// Channel index; `None` for scalar metrics.
    pub channel: Option<usize>,
}

impl RecordKey {
    pub fn resolve(run: &RunInfo, lane: u16, tile: u32, cycle: u16) -> Self {
        RecordKey {
            lane,
            tile,
            surface: run.flowcell.surface_of(tile),
            cycle,
            read: run.read_for_cycle(cycle).map(|r| r.number),
            channel: None,
        }
    }

    pub fn with_channel(self, channel: usize) -> Self {
        RecordKey {
            channel: Some(channel),
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// CycleRange
// ---------------------------------------------------------------------------

/// Inclusive cycle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRange {
    pub first: u16,
    pub last: u16,
}

impl CycleRange {
    pub fn contains(&self, cycle: u16) -> bool {
        (self.first..=self.last).contains(&cycle)
    }
}

// ---------------------------------------------------------------------------
// FilterOptions
// ---------------------------------------------------------------------------

/// Selection applied before grouping. Every set field must match; an unset
/// field matches everything.
///
/// `naming` only changes how tiles are rendered in titles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub naming: TileNaming,
    pub lane: Option<u16>,
    pub surface: Option<u8>,
    pub tile: Option<u32>,
    /// Channel (or base) index. Ignored for scalar metrics.
    pub channel: Option<usize>,
    pub read: Option<u16>,
    pub cycles: Option<CycleRange>,
}

impl FilterOptions {
    pub fn new(naming: TileNaming) -> Self {
        FilterOptions {
            naming,
            ..Default::default()
        }
    }

    pub fn lane(mut self, lane: u16) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn surface(mut self, surface: u8) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn tile(mut self, tile: u32) -> Self {
        self.tile = Some(tile);
        self
    }

    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn read(mut self, read: u16) -> Self {
        self.read = Some(read);
        self
    }

    pub fn cycles(mut self, first: u16, last: u16) -> Self {
        self.cycles = Some(CycleRange { first, last });
        self
    }

    /// Check the filter against the run topology.
    pub fn validate(&self, run: &RunInfo) -> Result<(), PlotError> {
        if let Some(read) = self.read {
            if run.read(read).is_none() {
                return Err(PlotError::InvalidFilter(format!(
                    "read {read} is not part of the run"
                )));
            }
        }
        if let Some(range) = self.cycles {
            if range.first == 0 || range.first > range.last {
                return Err(PlotError::InvalidFilter(format!(
                    "cycle range {}-{} is empty",
                    range.first, range.last
                )));
            }
        }
        Ok(())
    }

    /// Whether a value at `key` passes every active constraint.
    pub fn matches(&self, key: &RecordKey) -> bool {
        fn allows<T: PartialEq>(wanted: Option<T>, actual: T) -> bool {
            wanted.map_or(true, |w| w == actual)
        }

        allows(self.lane, key.lane)
            && allows(self.surface, key.surface)
            && allows(self.tile, key.tile)
            && self.read.map_or(true, |r| key.read == Some(r))
            && self.cycles.map_or(true, |c| c.contains(key.cycle))
            && match key.channel {
                Some(channel) => allows(self.channel, channel),
                None => true,
            }
    }

    // -- Title tokens --

    pub fn lane_description(&self) -> String {
        match self.lane {
            Some(lane) => format!("Lane {lane}"),
            None => "All Lanes".to_string(),
        }
    }

    pub fn surface_description(&self) -> String {
        match self.surface {
            Some(surface) => format!("Surface {surface}"),
            None => "All Surfaces".to_string(),
        }
    }

    pub fn channel_description(&self, family: MetricFamily, run: &RunInfo) -> String {
        match (self.channel, family.channel_dimension()) {
            (Some(c), _) => family.channel_name(c, run),
            (None, ChannelDimension::Channel) => "All Channels".to_string(),
            (None, ChannelDimension::Base) => "All Bases".to_string(),
        }
    }

    /// Plot title: lane, tile, channel, surface, read, cycles.
    ///
    /// Tile, read and cycle tokens only appear when restricted; the channel
    /// token only for channel-resolved metrics.
    pub fn title(&self, metric: MetricKind, channel_resolved: bool, run: &RunInfo) -> String {
        let mut parts = vec![self.lane_description()];
        if let Some(tile) = self.tile {
            parts.push(format!("Tile {}", self.naming.tile_label(self.lane, tile)));
        }
        if channel_resolved {
            parts.push(self.channel_description(metric.family(), run));
        }
        parts.push(self.surface_description());
        if let Some(read) = self.read {
            parts.push(format!("Read {read}"));
        }
        if let Some(range) = self.cycles {
            parts.push(format!("Cycles {}-{}", range.first, range.last));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{FlowcellLayout, ReadInfo};

    fn run() -> RunInfo {
        RunInfo::new(
            "",
            FlowcellLayout::new(2, 2, 2, 16),
            vec![ReadInfo::new(1, 1, 26), ReadInfo::new(2, 27, 76)],
        )
    }

    #[test]
    fn unset_filter_matches_everything() {
        let options = FilterOptions::default();
        let key = RecordKey::resolve(&run(), 2, 2101, 30).with_channel(3);
        assert!(options.matches(&key));
    }

    #[test]
    fn constraints_are_conjunctive() {
        let run = run();
        let options = FilterOptions::default().lane(1).surface(2);
        assert!(options.matches(&RecordKey::resolve(&run, 1, 2101, 1)));
        assert!(!options.matches(&RecordKey::resolve(&run, 1, 1101, 1)));
        assert!(!options.matches(&RecordKey::resolve(&run, 2, 2101, 1)));
    }

    #[test]
    fn read_and_cycle_constraints() {
        let run = run();
        let by_read = FilterOptions::default().read(2);
        assert!(!by_read.matches(&RecordKey::resolve(&run, 1, 1101, 26)));
        assert!(by_read.matches(&RecordKey::resolve(&run, 1, 1101, 27)));
        // cycle outside every read never matches a read filter
        assert!(!by_read.matches(&RecordKey::resolve(&run, 1, 1101, 90)));

        let by_cycle = FilterOptions::default().cycles(2, 3);
        assert!(!by_cycle.matches(&RecordKey::resolve(&run, 1, 1101, 1)));
        assert!(by_cycle.matches(&RecordKey::resolve(&run, 1, 1101, 3)));
    }

    #[test]
    fn channel_constraint_skips_scalars() {
        let run = run();
        let options = FilterOptions::default().channel(1);
        let key = RecordKey::resolve(&run, 1, 1101, 1);
        assert!(options.matches(&key));
        assert!(options.matches(&key.with_channel(1)));
        assert!(!options.matches(&key.with_channel(0)));
    }

    #[test]
    fn naming_does_not_change_matching() {
        let run = run();
        let key = RecordKey::resolve(&run, 1, 1101, 1);
        for naming in [TileNaming::FourDigit, TileNaming::FiveDigit, TileNaming::Absolute] {
            assert!(FilterOptions::new(naming).tile(1101).matches(&key));
        }
    }

    #[test]
    fn validate_rejects_unknown_read_and_empty_range() {
        let run = run();
        assert!(FilterOptions::default().read(2).validate(&run).is_ok());
        assert!(matches!(
            FilterOptions::default().read(3).validate(&run),
            Err(PlotError::InvalidFilter(_))
        ));
        assert!(FilterOptions::default().cycles(5, 4).validate(&run).is_err());
        assert!(FilterOptions::default().cycles(0, 4).validate(&run).is_err());
    }

    #[test]
    fn titles() {
        let run = run();
        assert_eq!(
            FilterOptions::default().title(MetricKind::Intensity, true, &run),
            "All Lanes All Channels All Surfaces"
        );
        assert_eq!(
            FilterOptions::default().title(MetricKind::ErrorRate, false, &run),
            "All Lanes All Surfaces"
        );
        assert_eq!(
            FilterOptions::default()
                .lane(1)
                .channel(2)
                .title(MetricKind::CorrectedIntensity, true, &run),
            "Lane 1 G All Surfaces"
        );
        assert_eq!(
            FilterOptions::new(TileNaming::Absolute)
                .lane(2)
                .tile(7)
                .surface(1)
                .read(1)
                .title(MetricKind::Intensity, true, &run),
            "Lane 2 Tile 2_7 All Channels Surface 1 Read 1"
        );
        assert_eq!(
            FilterOptions::new(TileNaming::Absolute)
                .tile(7)
                .title(MetricKind::ErrorRate, false, &run),
            "All Lanes Tile 7 All Surfaces"
        );
        assert_eq!(
            FilterOptions::default()
                .cycles(1, 10)
                .title(MetricKind::PercentQ30, false, &run),
            "All Lanes All Surfaces Cycles 1-10"
        );
    }
}
