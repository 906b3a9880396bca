use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, LargeStringArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::source::{MeasurementSource, SampleType, Signal, SourceChannel, SourceGroup};
use crate::core::{AttrValue, Attrs};

/// Columns with a fixed meaning in CSV and Parquet files; every other
/// column becomes a channel attribute.
const RESERVED_COLUMNS: [&str; 6] = ["group", "name", "unit", "source_path", "timestamps", "samples"];

/// One channel as stored in a measurement file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChannelRecord {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub timestamps: Vec<f64>,
    #[serde(default)]
    pub samples: Vec<f64>,
    #[serde(default)]
    pub attrs: Attrs,
    /// Element type before widening; `Float64` when unknown.
    #[serde(skip)]
    pub sample_type: Option<SampleType>,
}

impl ChannelRecord {
    pub fn new(name: &str, source_path: Option<&str>, timestamps: Vec<f64>, samples: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            source_path: source_path.map(str::to_string),
            timestamps,
            samples,
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }
}

/// A measurement file held in memory.
///
/// `open` and `from_groups` read every signal up front. `get` copies from
/// memory and performs no file I/O, so the per-segment loaders bound by the
/// reader only defer that copy. Peak memory is the whole file.
///
/// Groups and channels are addressed by position, in file order.
#[derive(Debug, Clone, Default)]
pub struct MeasurementFile {
    groups: Vec<SourceGroup>,
    signals: Vec<Vec<Signal>>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

impl MeasurementFile {
    /// Load a measurement file.  Dispatch by extension.
    ///
    /// Supported formats:
    /// * `.parquet` / `.pq` – one row per channel, `timestamps`/`samples` list columns
    /// * `.json`            – `{ "groups": [ { "channels": [ ... ] } ] }`
    /// * `.csv`             – one row per channel, arrays as semicolon-separated floats
    pub fn open(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let file = match ext.as_str() {
            "parquet" | "pq" => load_parquet(path),
            "json" => load_json(path),
            "csv" => load_csv(path),
            other => bail!("Unsupported file extension: .{other}"),
        }
        .with_context(|| format!("loading measurement file {}", path.display()))?;

        log::info!(
            "Loaded {} group(s), {} channel(s) from {}",
            file.groups.len(),
            file.n_channels(),
            path.display()
        );
        Ok(file)
    }

    /// Build a file from channel records, one inner vector per group.
    pub fn from_groups(groups: Vec<Vec<ChannelRecord>>) -> Result<Self> {
        let mut file = Self::default();

        for (g, records) in groups.into_iter().enumerate() {
            let mut group = SourceGroup::default();
            let mut signals = Vec::with_capacity(records.len());

            for record in records {
                if record.timestamps.len() != record.samples.len() {
                    bail!(
                        "group {g}, channel '{}': {} timestamps but {} samples",
                        record.name,
                        record.timestamps.len(),
                        record.samples.len()
                    );
                }
                let time_bounds = record
                    .timestamps
                    .first()
                    .zip(record.timestamps.last())
                    .map(|(&start, &end)| (start, end));

                group.channels.push(SourceChannel {
                    name: record.name,
                    unit: record.unit,
                    samples_count: record.timestamps.len(),
                    source_path: record.source_path,
                    sample_type: Some(record.sample_type.unwrap_or(SampleType::Float64)),
                    time_bounds,
                    attrs: record.attrs,
                });
                signals.push(Signal {
                    timestamps: record.timestamps,
                    samples: record.samples,
                });
            }

            file.groups.push(group);
            file.signals.push(signals);
        }

        Ok(file)
    }

    pub fn n_channels(&self) -> usize {
        self.groups.iter().map(|g| g.channels.len()).sum()
    }
}

impl MeasurementSource for MeasurementFile {
    fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    fn get(&self, group: usize, channel: usize) -> Result<Signal> {
        self.signals
            .get(group)
            .and_then(|signals| signals.get(channel))
            .cloned()
            .ok_or_else(|| anyhow!("no channel at group {group}, position {channel}"))
    }
}

/// Records keyed by group number → groups in ascending group order, rows
/// kept in file order inside each group.
fn into_groups(rows: Vec<(i64, ChannelRecord)>) -> Vec<Vec<ChannelRecord>> {
    let mut groups: BTreeMap<i64, Vec<ChannelRecord>> = BTreeMap::new();
    for (group, record) in rows {
        groups.entry(group).or_default().push(record);
    }
    groups.into_values().collect()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct JsonFile {
    groups: Vec<JsonGroup>,
}

#[derive(Deserialize)]
struct JsonGroup {
    #[serde(default)]
    channels: Vec<ChannelRecord>,
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "groups": [
///     { "channels": [
///         { "name": "eng_spd", "unit": "rpm", "source_path": "Concerto/RecResult[1]",
///           "timestamps": [0.0, 0.1], "samples": [800.0, 810.0],
///           "attrs": { "ecu": "ME17" } }
///     ] }
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<MeasurementFile> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<MeasurementFile> {
    let root: JsonFile = serde_json::from_str(text).context("parsing JSON")?;
    MeasurementFile::from_groups(root.groups.into_iter().map(|g| g.channels).collect())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row, one channel per row.
/// Required columns: `group`, `name`, `timestamps`, `samples`; optional
/// `unit` and `source_path` (empty = none). Arrays are semicolon-separated
/// floats: `"0.0;0.1;0.2"`. All other columns become channel attributes.
fn load_csv(path: &Path) -> Result<MeasurementFile> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| position(name).with_context(|| format!("CSV missing '{name}' column"));

    let group_idx = required("group")?;
    let name_idx = required("name")?;
    let time_idx = required("timestamps")?;
    let samples_idx = required("samples")?;
    let unit_idx = position("unit");
    let path_idx = position("source_path");

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let optional = |idx: Option<usize>| {
            idx.map(field)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let group: i64 = field(group_idx)
            .parse()
            .with_context(|| format!("CSV row {row_no}: invalid group '{}'", field(group_idx)))?;
        let timestamps = parse_semicolon_floats(field(time_idx), row_no, "timestamps")?;
        let samples = parse_semicolon_floats(field(samples_idx), row_no, "samples")?;

        let mut attrs = Attrs::new();
        for (col_idx, value) in record.iter().enumerate() {
            let col_name = &headers[col_idx];
            if RESERVED_COLUMNS.contains(&col_name.as_str()) {
                continue;
            }
            attrs.insert(col_name.clone(), guess_attr_type(value));
        }

        rows.push((
            group,
            ChannelRecord {
                name: field(name_idx).to_string(),
                unit: optional(unit_idx),
                source_path: optional(path_idx),
                timestamps,
                samples,
                attrs,
                sample_type: Some(SampleType::Float64),
            },
        ));
    }

    MeasurementFile::from_groups(into_groups(rows))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn guess_attr_type(s: &str) -> AttrValue {
    if s.is_empty() {
        return AttrValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return AttrValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return AttrValue::Float(f);
    }
    if s == "true" || s == "false" {
        return AttrValue::Bool(s == "true");
    }
    AttrValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet measurement file, one row per channel.
///
/// Expected schema:
/// - `group`: Int32 or Int64
/// - `name`: Utf8
/// - `unit`, `source_path`: nullable Utf8 (optional columns)
/// - `timestamps`, `samples`: List or LargeList of Float64/Float32; the
///   inner type of `samples` is reported as the channel's sample type
/// - Any other columns are channel attributes (strings, ints, floats, bools)
fn load_parquet(path: &Path) -> Result<MeasurementFile> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        read_batch(&batch, &mut rows)?;
    }

    MeasurementFile::from_groups(into_groups(rows))
}

fn read_batch(batch: &RecordBatch, rows: &mut Vec<(i64, ChannelRecord)>) -> Result<()> {
    let schema = batch.schema();
    let required = |name: &str| {
        schema
            .index_of(name)
            .map(|i| batch.column(i))
            .map_err(|_| anyhow!("Parquet file missing '{name}' column"))
    };
    let optional = |name: &str| schema.index_of(name).ok().map(|i| batch.column(i));

    let group_col = required("group")?;
    let name_col = required("name")?;
    let time_col = required("timestamps")?;
    let samples_col = required("samples")?;
    let unit_col = optional("unit");
    let path_col = optional("source_path");

    let attr_cols: Vec<(&ArrayRef, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !RESERVED_COLUMNS.contains(&f.name().as_str()))
        .map(|(i, f)| (batch.column(i), f.name().clone()))
        .collect();

    for row in 0..batch.num_rows() {
        let group = extract_i64(group_col, row).with_context(|| format!("Row {row}: failed to read 'group'"))?;
        let name = extract_string(name_col, row)?
            .with_context(|| format!("Row {row}: channel name is null"))?;
        let unit = unit_col.map(|c| extract_string(c, row)).transpose()?.flatten();
        let source_path = path_col.map(|c| extract_string(c, row)).transpose()?.flatten();

        let (timestamps, _) = extract_f64_list(time_col, row)
            .with_context(|| format!("Row {row}: failed to read 'timestamps'"))?;
        let (samples, sample_type) = extract_f64_list(samples_col, row)
            .with_context(|| format!("Row {row}: failed to read 'samples'"))?;

        let attrs = attr_cols
            .iter()
            .map(|(col, col_name)| (col_name.clone(), extract_attr_value(col, row)))
            .collect();

        rows.push((
            group,
            ChannelRecord {
                name,
                unit,
                source_path,
                timestamps,
                samples,
                attrs,
                sample_type: Some(sample_type),
            },
        ));
    }

    Ok(())
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
/// A null list reads as empty (metadata channels).
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<(Vec<f64>, SampleType)> {
    let (inner, values) = match col.data_type() {
        DataType::List(field) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            (field.data_type(), (!list_arr.is_null(row)).then(|| list_arr.value(row)))
        }
        DataType::LargeList(field) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            (field.data_type(), (!list_arr.is_null(row)).then(|| list_arr.value(row)))
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    match inner {
        DataType::Float64 => {
            let data = match values {
                Some(values) => values
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .context("expected Float64Array")?
                    .iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect(),
                None => Vec::new(),
            };
            Ok((data, SampleType::Float64))
        }
        DataType::Float32 => {
            let data = match values {
                Some(values) => values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .context("expected Float32Array")?
                    .iter()
                    .map(|v| f64::from(v.unwrap_or(f32::NAN)))
                    .collect(),
                None => Vec::new(),
            };
            Ok((data, SampleType::Float32))
        }
        other => bail!("List inner type is {other:?}, expected Float64 or Float32"),
    }
}

fn extract_i64(col: &ArrayRef, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null value in integer column");
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Int64Array>() {
        Ok(arr.value(row))
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        Ok(i64::from(arr.value(row)))
    } else {
        bail!("Expected Int32 or Int64 column, got {:?}", col.data_type())
    }
}

fn extract_string(col: &ArrayRef, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<StringArray>() {
        Ok(Some(arr.value(row).to_string()))
    } else if let Some(arr) = any.downcast_ref::<LargeStringArray>() {
        Ok(Some(arr.value(row).to_string()))
    } else {
        bail!("Expected Utf8 column, got {:?}", col.data_type())
    }
}

/// Extract a single attribute value from an Arrow column at a given row.
fn extract_attr_value(col: &ArrayRef, row: usize) -> AttrValue {
    if col.is_null(row) {
        return AttrValue::Null;
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<StringArray>() {
        AttrValue::String(arr.value(row).to_string())
    } else if let Some(arr) = any.downcast_ref::<LargeStringArray>() {
        AttrValue::String(arr.value(row).to_string())
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        AttrValue::Integer(i64::from(arr.value(row)))
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        AttrValue::Integer(arr.value(row))
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        AttrValue::Float(f64::from(arr.value(row)))
    } else if let Some(arr) = any.downcast_ref::<Float64Array>() {
        AttrValue::Float(arr.value(row))
    } else if let Some(arr) = any.downcast_ref::<BooleanArray>() {
        AttrValue::Bool(arr.value(row))
    } else {
        AttrValue::String(format!("{:?}", col.data_type()))
    }
}
