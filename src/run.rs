use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tile naming
// ---------------------------------------------------------------------------

/// How tile numbers are encoded and rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileNaming {
    /// `SSTT` style: surface, swath and two tile digits (e.g. 1101).
    #[default]
    FourDigit,
    /// `SSTTT` style: surface, swath and three tile digits (e.g. 11101).
    FiveDigit,
    /// Tiles numbered 1..N across the whole lane.
    Absolute,
}

impl TileNaming {
    /// Display label for a tile. Absolute tiles are prefixed with their
    /// lane when one is known.
    pub fn tile_label(self, lane: Option<u16>, tile: u32) -> String {
        match (self, lane) {
            (TileNaming::FourDigit, _) => format!("{tile:04}"),
            (TileNaming::FiveDigit, _) => format!("{tile:05}"),
            (TileNaming::Absolute, Some(lane)) => format!("{lane}_{tile}"),
            (TileNaming::Absolute, None) => tile.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Flowcell layout
// ---------------------------------------------------------------------------

/// Physical tile layout of the flowcell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowcellLayout {
    pub lane_count: u16,
    pub surface_count: u8,
    pub swath_count: u8,
    /// Tiles per swath.
    pub tile_count: u16,
    #[serde(default)]
    pub naming: TileNaming,
}

impl Default for FlowcellLayout {
    fn default() -> Self {
        FlowcellLayout {
            lane_count: 1,
            surface_count: 1,
            swath_count: 1,
            tile_count: 1,
            naming: TileNaming::FourDigit,
        }
    }
}

impl FlowcellLayout {
    pub fn new(lane_count: u16, surface_count: u8, swath_count: u8, tile_count: u16) -> Self {
        FlowcellLayout {
            lane_count,
            surface_count,
            swath_count,
            tile_count,
            naming: TileNaming::FourDigit,
        }
    }

    pub fn with_naming(mut self, naming: TileNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Surface (1-based) a tile number belongs to.
    pub fn surface_of(&self, tile: u32) -> u8 {
        match self.naming {
            TileNaming::FourDigit => u8::try_from(tile / 1000).unwrap_or(u8::MAX),
            TileNaming::FiveDigit => u8::try_from(tile / 10000).unwrap_or(u8::MAX),
            TileNaming::Absolute => {
                let per_surface = self.swath_count as u32 * self.tile_count as u32;
                if per_surface == 0 || tile == 0 {
                    return 1;
                }
                let surface = 1 + (tile - 1) / per_surface;
                surface.min(self.surface_count.max(1) as u32) as u8
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// One sequencing read and the (inclusive) cycles it spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadInfo {
    pub number: u16,
    pub first_cycle: u16,
    pub last_cycle: u16,
    #[serde(default)]
    pub is_index: bool,
}

impl ReadInfo {
    pub fn new(number: u16, first_cycle: u16, last_cycle: u16) -> Self {
        ReadInfo {
            number,
            first_cycle,
            last_cycle,
            is_index: false,
        }
    }

    pub fn contains(&self, cycle: u16) -> bool {
        (self.first_cycle..=self.last_cycle).contains(&cycle)
    }

    pub fn cycle_count(&self) -> u16 {
        self.last_cycle.saturating_add(1).saturating_sub(self.first_cycle)
    }
}

// ---------------------------------------------------------------------------
// Instrument / channel convention
// ---------------------------------------------------------------------------

/// Instrument generation, used to name imaging channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentType {
    HiSeq,
    HiScan,
    MiSeq,
    NextSeq,
    MiniSeq,
    NovaSeq,
    Unknown,
}

impl InstrumentType {
    /// Channel names under the legacy convention for this instrument.
    pub fn legacy_channel_names(self) -> Vec<String> {
        let names: &[&str] = match self {
            InstrumentType::HiSeq | InstrumentType::HiScan | InstrumentType::MiSeq => {
                &["A", "C", "G", "T"]
            }
            InstrumentType::NextSeq | InstrumentType::MiniSeq | InstrumentType::NovaSeq => {
                &["Red", "Green"]
            }
            InstrumentType::Unknown => &[],
        };
        names.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// RunInfo – the run topology
// ---------------------------------------------------------------------------

/// Run topology: reads, flowcell layout and channel names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flowcell: FlowcellLayout,
    #[serde(default)]
    pub reads: Vec<ReadInfo>,
    /// Imaging channel names; empty when the run info carries none.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl RunInfo {
    pub fn new(name: &str, flowcell: FlowcellLayout, reads: Vec<ReadInfo>) -> Self {
        RunInfo {
            name: name.to_string(),
            flowcell,
            reads,
            channels: Vec::new(),
        }
    }

    /// Replace the channel names with the legacy convention of `instrument`.
    ///
    /// Older run info files carry no channel names; this supplies them
    /// without any process-wide switch.
    pub fn with_legacy_channels(mut self, instrument: InstrumentType) -> Self {
        let names = instrument.legacy_channel_names();
        if !names.is_empty() {
            log::debug!("using {instrument} channel names {names:?}");
            self.channels = names;
        }
        self
    }

    pub fn read(&self, number: u16) -> Option<&ReadInfo> {
        self.reads.iter().find(|r| r.number == number)
    }

    /// The read a cycle belongs to, if any.
    pub fn read_for_cycle(&self, cycle: u16) -> Option<&ReadInfo> {
        self.reads.iter().find(|r| r.contains(cycle))
    }

    pub fn total_cycles(&self) -> u16 {
        self.reads.iter().map(|r| r.last_cycle).max().unwrap_or(0)
    }

    /// Display name of an imaging channel (0-based index).
    pub fn channel_name(&self, channel: usize) -> String {
        self.channels
            .get(channel)
            .cloned()
            .unwrap_or_else(|| format!("Channel {}", channel + 1))
    }
}
