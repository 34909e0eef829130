use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterOptions;
use crate::data::model::MetricKind;
use crate::run::{InstrumentType, RunInfo};

// ---------------------------------------------------------------------------
// PlotRequest – what to plot
// ---------------------------------------------------------------------------

/// A plot request as read from JSON:
///
/// ```json
/// {
///   "metric": "intensity",
///   "instrument": "HiSeq",
///   "filter": { "naming": "FourDigit", "lane": 1 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub metric: MetricKind,
    #[serde(default)]
    pub filter: FilterOptions,
    /// Applies the instrument's legacy channel names to the run.
    #[serde(default)]
    pub instrument: Option<InstrumentType>,
}

impl PlotRequest {
    pub fn new(metric: MetricKind) -> Self {
        PlotRequest {
            metric,
            filter: FilterOptions::default(),
            instrument: None,
        }
    }

    /// The run with this request's channel convention applied.
    pub fn apply_to(&self, run: RunInfo) -> RunInfo {
        match self.instrument {
            Some(instrument) => run.with_legacy_channels(instrument),
            None => run,
        }
    }
}

pub fn load_request(path: &Path) -> Result<PlotRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

pub fn load_run_info(path: &Path) -> Result<RunInfo> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading run info {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing run info {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::run::TileNaming;

    #[test]
    fn request_defaults_to_unfiltered() {
        let request: PlotRequest = serde_json::from_str(r#"{"metric": "fwhm"}"#).unwrap();
        assert_eq!(request, PlotRequest::new(MetricKind::Fwhm));
    }

    #[test]
    fn request_with_filter_and_instrument() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"metric": "percent_q30", "instrument": "MiSeq",
                 "filter": {{"naming": "Absolute", "lane": 3, "cycles": {{"first": 1, "last": 25}}}}}}"#
        )
        .unwrap();
        let request = load_request(file.path()).unwrap();
        assert_eq!(request.metric, MetricKind::PercentQ30);
        assert_eq!(request.instrument, Some(InstrumentType::MiSeq));
        assert_eq!(request.filter.naming, TileNaming::Absolute);
        assert_eq!(request.filter.lane, Some(3));
        assert_eq!(request.filter.surface, None);
        assert_eq!(request.filter.cycles.map(|c| c.last), Some(25));

        let run = request.apply_to(RunInfo::default());
        assert_eq!(run.channels, vec!["A", "C", "G", "T"]);
    }

    #[test]
    fn run_info_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "run1",
                 "flowcell": {{"lane_count": 2, "surface_count": 2, "swath_count": 2, "tile_count": 16}},
                 "reads": [{{"number": 1, "first_cycle": 1, "last_cycle": 26}},
                           {{"number": 2, "first_cycle": 27, "last_cycle": 76, "is_index": false}}]}}"#
        )
        .unwrap();
        let run = load_run_info(file.path()).unwrap();
        assert_eq!(run.name, "run1");
        assert_eq!(run.flowcell.naming, TileNaming::FourDigit);
        assert_eq!(run.reads.len(), 2);
        assert!(run.channels.is_empty());
    }

    #[test]
    fn bad_request_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"metric": "brightness"}}"#).unwrap();
        let err = load_request(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing request"));
    }
}
