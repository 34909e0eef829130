use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    LargeListArray, ListArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{FieldShape, FieldSpec, FieldValue, MetricFamily, MetricRecord, MetricSet};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the records of one metric family from a file.  Dispatch by extension.
///
/// Every file carries `lane`, `tile` and `cycle` plus one column per field of
/// the family schema. Supported formats:
/// * `.parquet` – per-channel fields as List<Float32|Float64> columns
/// * `.json`    – `[{ "lane": 1, "tile": 1101, "cycle": 1, "intensity": [...] }, ...]`
/// * `.csv`     – per-channel fields as semicolon-separated floats
pub fn load_file(path: &Path, family: MetricFamily) -> Result<MetricSet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let set = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, family),
        "json" => load_json(path, family),
        "csv" => load_csv(path, family),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {family} records from {}", path.display()))?;

    log::info!(
        "loaded {} {family} records ({} lanes, {} cycles) from {}",
        set.len(),
        set.lanes().len(),
        set.cycles().len(),
        path.display()
    );
    Ok(set)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "lane": 1, "tile": 1101, "cycle": 1,
///     "intensity": [310.0, 295.5, 280.0, 301.2],
///     "fwhm": [2.6, 2.7, 2.5, 2.6] },
///   ...
/// ]
/// ```
fn load_json(path: &Path, family: MetricFamily) -> Result<MetricSet> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let lane = json_key(obj.get("lane"), i, "lane")?;
        let tile = json_key(obj.get("tile"), i, "tile")?;
        let cycle = json_key(obj.get("cycle"), i, "cycle")?;

        let fields = family
            .schema()
            .iter()
            .map(|spec| {
                let raw = obj
                    .get(spec.name)
                    .with_context(|| format!("Row {i}: missing '{}'", spec.name))?;
                let value: FieldValue = serde_json::from_value(raw.clone())
                    .with_context(|| format!("Row {i}: '{}' is not a number or list", spec.name))?;
                check_shape(&value, spec, i)?;
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;

        records.push(MetricRecord::new(lane, tile, cycle, fields));
    }

    Ok(MetricSet::new(family, records))
}

fn json_key<T: TryFrom<u64>>(val: Option<&JsonValue>, row: usize, col: &str) -> Result<T> {
    let n = val
        .and_then(|v| v.as_u64())
        .with_context(|| format!("Row {row}: missing or invalid '{col}'"))?;
    T::try_from(n)
        .ok()
        .with_context(|| format!("Row {row}: '{col}' {n} is out of range"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with `lane`, `tile`, `cycle` and the field names.
/// Per-channel fields contain semicolon-separated floats:
///   `"310.0;295.5;280.0;301.2"`
fn load_csv(path: &Path, family: MetricFamily) -> Result<MetricSet> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let lane_idx = column("lane")?;
    let tile_idx = column("tile")?;
    let cycle_idx = column("cycle")?;
    let field_idx = family
        .schema()
        .iter()
        .map(|spec| column(spec.name))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let lane = parse_key(cell(lane_idx), row_no, "lane")?;
        let tile = parse_key(cell(tile_idx), row_no, "tile")?;
        let cycle = parse_key(cell(cycle_idx), row_no, "cycle")?;

        let fields = family
            .schema()
            .iter()
            .zip(&field_idx)
            .map(|(spec, &idx)| match spec.shape {
                FieldShape::Scalar => parse_float(cell(idx), row_no, spec.name).map(FieldValue::Scalar),
                FieldShape::PerChannel => {
                    parse_semicolon_floats(cell(idx), row_no, spec.name).map(FieldValue::PerChannel)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        records.push(MetricRecord::new(lane, tile, cycle, fields));
    }

    Ok(MetricSet::new(family, records))
}

fn parse_key<T: std::str::FromStr>(s: &str, row: usize, col: &str) -> Result<T> {
    s.parse::<T>()
        .ok()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a valid number"))
}

fn parse_float(s: &str, row: usize, col: &str) -> Result<f32> {
    s.parse::<f32>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f32>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f32>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn check_shape(value: &FieldValue, spec: &FieldSpec, row: usize) -> Result<()> {
    if value.shape() != spec.shape {
        bail!(
            "Row {row}: '{}' should be {}",
            spec.name,
            match spec.shape {
                FieldShape::Scalar => "a number",
                FieldShape::PerChannel => "a list of numbers",
            }
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of metric records.
///
/// Expected schema:
/// - `lane`, `tile`, `cycle`: any signed or unsigned integer column (8 to 64 bit)
/// - scalar fields: Float32 or Float64
/// - per-channel fields: List or LargeList of Float32/Float64
fn load_parquet(path: &Path, family: MetricFamily) -> Result<MetricSet> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };

        let lane_col = column("lane")?;
        let tile_col = column("tile")?;
        let cycle_col = column("cycle")?;
        let field_cols = family
            .schema()
            .iter()
            .map(|spec| column(spec.name))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let lane = extract_u64(lane_col, row)
                .and_then(|v| u16::try_from(v).context("lane out of range"))
                .with_context(|| format!("Row {row}: failed to read 'lane'"))?;
            let tile = extract_u64(tile_col, row)
                .and_then(|v| u32::try_from(v).context("tile out of range"))
                .with_context(|| format!("Row {row}: failed to read 'tile'"))?;
            let cycle = extract_u64(cycle_col, row)
                .and_then(|v| u16::try_from(v).context("cycle out of range"))
                .with_context(|| format!("Row {row}: failed to read 'cycle'"))?;

            let fields = family
                .schema()
                .iter()
                .zip(&field_cols)
                .map(|(spec, col)| {
                    let value = match spec.shape {
                        FieldShape::Scalar => extract_f32(col, row).map(FieldValue::Scalar),
                        FieldShape::PerChannel => {
                            extract_f32_list(col, row).map(FieldValue::PerChannel)
                        }
                    };
                    value.with_context(|| format!("Row {row}: failed to read '{}'", spec.name))
                })
                .collect::<Result<Vec<_>>>()?;

            records.push(MetricRecord::new(lane, tile, cycle, fields));
        }
    }

    Ok(MetricSet::new(family, records))
}

// -- Parquet / Arrow helpers --

/// Extract a non-negative integer key from an 8 to 64 bit integer column.
fn extract_u64(col: &Arc<dyn Array>, row: usize) -> Result<u64> {
    if col.is_null(row) {
        bail!("null key");
    }
    let any = col.as_any();
    let value: i128 = match col.data_type() {
        DataType::Int8 => any.downcast_ref::<Int8Array>().context("expected Int8Array")?.value(row) as i128,
        DataType::Int16 => any.downcast_ref::<Int16Array>().context("expected Int16Array")?.value(row) as i128,
        DataType::Int32 => any.downcast_ref::<Int32Array>().context("expected Int32Array")?.value(row) as i128,
        DataType::Int64 => any.downcast_ref::<Int64Array>().context("expected Int64Array")?.value(row) as i128,
        DataType::UInt16 => any.downcast_ref::<UInt16Array>().context("expected UInt16Array")?.value(row) as i128,
        DataType::UInt8 => any.downcast_ref::<UInt8Array>().context("expected UInt8Array")?.value(row) as i128,
        DataType::UInt32 => any.downcast_ref::<UInt32Array>().context("expected UInt32Array")?.value(row) as i128,
        DataType::UInt64 => any.downcast_ref::<UInt64Array>().context("expected UInt64Array")?.value(row) as i128,
        other => bail!("Expected an integer column, got {other:?}"),
    };
    u64::try_from(value).context("negative key")
}

/// Extract a scalar float; nulls become NaN.
fn extract_f32(col: &Arc<dyn Array>, row: usize) -> Result<f32> {
    if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok(if arr.is_null(row) { f32::NAN } else { arr.value(row) })
    } else if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok(if arr.is_null(row) { f32::NAN } else { arr.value(row) as f32 })
    } else {
        bail!("Expected Float32 or Float64 column, got {:?}", col.data_type())
    }
}

/// Extract a `Vec<f32>` from a List or LargeList column at the given row.
fn extract_f32_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f32>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float32 or Float64
    if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    } else if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.map_or(f32::NAN, |v| v as f32)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float32 or Float64",
            values_array.data_type()
        )
    }
}
