use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;

use rusty_mdf::config::ReaderConfig;
use rusty_mdf::core::{Closed, TimeSeries, TimeSeriesLike};
use rusty_mdf::io::{load_dataset_with, ChannelReader, LoadMode, MeasurementReader, TimeWindow};

#[derive(Parser)]
#[command(name = "rusty-mdf")]
#[command(about = "Inspect the logical channels of a segmented measurement file")]
struct Cli {
    /// Measurement file (.parquet, .pq, .json or .csv)
    file: PathBuf,

    /// Logical channel to read (repeatable). Lists all channels when omitted.
    #[arg(long = "channel", short = 'c')]
    channels: Vec<String>,

    /// Window start (inclusive)
    #[arg(long)]
    start: Option<f64>,

    /// Window end (inclusive)
    #[arg(long)]
    end: Option<f64>,

    /// Preferred recorder key (repeatable, highest priority first)
    #[arg(long = "default-key")]
    default_keys: Vec<String>,

    /// JSON reader configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report which segments the samples came from
    #[arg(long)]
    with_measure_id: bool,

    /// Assemble a lazy dataset and load only the requested channels
    #[arg(long)]
    lazy: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = reader_config(&cli)?;

    if cli.channels.is_empty() {
        let reader = MeasurementReader::open(&cli.file, config)?;
        return print_listing(&reader);
    }

    if cli.lazy {
        if cli.with_measure_id {
            log::warn!("--with-measure-id is ignored together with --lazy");
        }
        return print_lazy(&cli, config);
    }

    let reader = MeasurementReader::open(&cli.file, config)?;
    print_eager(&cli, &reader)
}

fn reader_config(cli: &Cli) -> Result<ReaderConfig> {
    let config = match &cli.config {
        Some(path) => ReaderConfig::from_json_file(path)?,
        None => ReaderConfig::default(),
    }
    .with_env_overrides();

    if cli.default_keys.is_empty() {
        Ok(config)
    } else {
        Ok(config.with_default_keys(cli.default_keys.iter().cloned()))
    }
}

fn print_listing(reader: &MeasurementReader) -> Result<()> {
    let channels = reader.list_channels();

    let names: Vec<&str> = channels.iter().map(|c| c.logical_name.as_str()).collect();
    let keys: Vec<&str> = channels.iter().map(|c| c.key.as_str()).collect();
    let units: Vec<Option<&str>> = channels.iter().map(|c| c.unit.as_deref()).collect();
    let dtypes: Vec<Option<String>> = channels
        .iter()
        .map(|c| c.dtype.map(|t| t.to_string()))
        .collect();
    let segments: Vec<u64> = channels.iter().map(|c| c.segments.len() as u64).collect();
    let samples: Vec<u64> = channels.iter().map(|c| c.n_samples() as u64).collect();
    let variants: Vec<String> = channels
        .iter()
        .map(|c| {
            reader
                .variants(&c.logical_name)
                .iter()
                .map(|v| v.key.as_str())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    let batch = RecordBatch::try_from_iter([
        ("channel", Arc::new(StringArray::from(names)) as ArrayRef),
        ("key", Arc::new(StringArray::from(keys)) as ArrayRef),
        ("unit", Arc::new(StringArray::from(units)) as ArrayRef),
        ("dtype", Arc::new(StringArray::from(dtypes)) as ArrayRef),
        ("segments", Arc::new(UInt64Array::from(segments)) as ArrayRef),
        ("samples", Arc::new(UInt64Array::from(samples)) as ArrayRef),
        ("variants", Arc::new(StringArray::from(variants)) as ArrayRef),
    ])
    .context("building channel table")?;

    println!("{}", pretty_format_batches(&[batch])?);

    let meta = reader.list_metadata_channels();
    if !meta.is_empty() {
        println!("metadata channels:");
        for m in meta {
            println!(
                "  {} (group {}, channel {}, source {})",
                m.name,
                m.group_index,
                m.channel_index,
                m.source_path.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn print_eager(cli: &Cli, reader: &MeasurementReader) -> Result<()> {
    let window = TimeWindow {
        start: cli.start,
        end: cli.end,
    };

    for name in &cli.channels {
        let data = reader.read_channel(name, window, cli.with_measure_id)?;
        let unit = reader.channel(name).and_then(|c| c.unit.as_deref());

        let segments = data.measure_id.as_ref().map(|ids| {
            let mut ids = ids.clone();
            ids.dedup();
            ids
        });

        let series = TimeSeries::new(data.time, data.values)
            .with_context(|| format!("channel '{name}'"))?
            .with_unit(unit);
        print_stats(name, &series)?;

        if let Some(segments) = segments {
            println!("  segments: {segments:?}");
        }
    }
    Ok(())
}

fn print_lazy(cli: &Cli, config: ReaderConfig) -> Result<()> {
    let dataset = load_dataset_with(&cli.file, config, LoadMode::Lazy)?;
    let segment = dataset
        .values()
        .next()
        .context("measurement file produced no segment")?;

    for name in &cli.channels {
        let channel = segment.channel(name)?;
        let sliced = channel.series().slice_time(cli.start, cli.end, Closed::Both)?;
        print_stats(name, &sliced)?;
    }
    Ok(())
}

fn print_stats(name: &str, series: &dyn TimeSeriesLike) -> Result<()> {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"));
    println!(
        "{name} [{}]: n={} t=[{}, {}] mean={} std={}",
        series.unit().unwrap_or("-"),
        series.n()?,
        fmt(series.t_start()?),
        fmt(series.t_end()?),
        fmt(series.mean(true)?),
        fmt(series.std(1, true)?),
    );
    Ok(())
}
