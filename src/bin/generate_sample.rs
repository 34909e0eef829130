use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float32Builder, Int32Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use cyclestat::config::PlotRequest;
use cyclestat::{FlowcellLayout, InstrumentType, MetricKind, ReadInfo, RunInfo};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Intensity decays with cycle; each channel has its own brightness.
fn intensity(channel: usize, cycle: u16, rng: &mut SimpleRng) -> f32 {
    let base = [340.0, 310.0, 260.0, 295.0][channel];
    let decay = (-(cycle as f64) / 150.0).exp();
    rng.gauss(base * decay, base * 0.04) as f32
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let layout = FlowcellLayout::new(2, 2, 2, 4);
    let run = RunInfo::new(
        "sample_run",
        layout,
        vec![ReadInfo::new(1, 1, 26), ReadInfo::new(2, 27, 76)],
    );
    let channels = 4;

    let mut lanes = Vec::new();
    let mut tiles = Vec::new();
    let mut cycles = Vec::new();
    let mut intensity_builder = ListBuilder::new(Float32Builder::new());
    let mut fwhm_builder = ListBuilder::new(Float32Builder::new());

    for lane in 1..=layout.lane_count {
        for surface in 1..=layout.surface_count as u32 {
            for swath in 1..=layout.swath_count as u32 {
                for tile in 1..=layout.tile_count as u32 {
                    let tile_number = surface * 1000 + swath * 100 + tile;
                    for cycle in 1..=run.total_cycles() {
                        lanes.push(lane as i32);
                        tiles.push(tile_number as i32);
                        cycles.push(cycle as i32);
                        for channel in 0..channels {
                            intensity_builder
                                .values()
                                .append_value(intensity(channel, cycle, &mut rng));
                            fwhm_builder
                                .values()
                                .append_value(rng.gauss(2.6, 0.08) as f32);
                        }
                        intensity_builder.append(true);
                        fwhm_builder.append(true);
                    }
                }
            }
        }
    }
    let rows = lanes.len();

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float32, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("lane", DataType::Int32, false),
        Field::new("tile", DataType::Int32, false),
        Field::new("cycle", DataType::Int32, false),
        Field::new("intensity", list_type.clone(), false),
        Field::new("fwhm", list_type, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(lanes)),
            Arc::new(Int32Array::from(tiles)),
            Arc::new(Int32Array::from(cycles)),
            Arc::new(intensity_builder.finish()),
            Arc::new(fwhm_builder.finish()),
        ],
    )
    .context("creating record batch")?;

    // Write Parquet
    let output_path = "sample_extraction.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    let mut request = PlotRequest::new(MetricKind::Intensity);
    request.instrument = Some(InstrumentType::HiSeq);
    std::fs::write("sample_run_info.json", serde_json::to_string_pretty(&run)?)
        .context("writing sample_run_info.json")?;
    std::fs::write("sample_request.json", serde_json::to_string_pretty(&request)?)
        .context("writing sample_request.json")?;

    println!(
        "Wrote {rows} extraction records ({channels} channels each) to {output_path}, \
         plus sample_run_info.json and sample_request.json"
    );
    Ok(())
}
