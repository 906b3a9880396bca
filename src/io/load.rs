use std::path::Path;
use std::sync::Arc;

use super::reader::{ChannelReader, MeasurementReader, RawChannelInfo};
use crate::config::ReaderConfig;
use crate::core::{
    Attrs, Channel, ChannelMeta, Dataset, DatasetMeta, LazyTimeSeries, Result, Segment,
    SegmentMeta, TimeSeries, TimeSeriesLike,
};

/// `SegmentMeta::kind` of segments built from a measurement file.
pub const IMPORT_KIND: &str = "mdf_import";

/// When channel samples are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every channel is read while the dataset is assembled.
    #[default]
    Eager,
    /// Channels are read on first data access.
    Lazy,
}

/// Wrap every logical channel of `reader` into a one-segment [`Dataset`].
///
/// Each channel carries its resolved unit and `"<origin>:<key>"` as source.
/// `source` (usually the file path) ends up on both the segment and the
/// dataset metadata.
pub fn assemble_dataset(
    reader: &MeasurementReader,
    segment_name: &str,
    source: Option<&str>,
    mode: LoadMode,
) -> Result<Dataset> {
    let channels = reader
        .list_channels()
        .into_iter()
        .map(|info| build_channel(reader, info, mode))
        .collect::<Result<Vec<_>>>()?;

    let segment_meta = SegmentMeta::new(
        Some(IMPORT_KIND.to_string()),
        None,
        source.map(str::to_string),
        None,
    );
    let segment = Segment::from_channels(segment_name, channels, segment_meta)?;

    log::info!(
        "Assembled segment '{}' with {} channel(s) ({:?})",
        segment.name(),
        segment.len(),
        mode
    );

    Dataset::from_segments(
        [segment],
        DatasetMeta::new(None, source.map(str::to_string), None),
    )
}

fn build_channel(reader: &MeasurementReader, info: &RawChannelInfo, mode: LoadMode) -> Result<Channel> {
    let provenance = format!("{}:{}", reader.config().origin, info.key);
    let meta = ChannelMeta::new(
        info.unit.clone(),
        None,
        Some(provenance),
        Some(source_attrs(reader, info)),
    );

    let unit = info.unit.as_deref();
    let name = Some(info.logical_name.as_str());
    let series: Arc<dyn TimeSeriesLike> = match mode {
        LoadMode::Eager => {
            let data = info.load(false)?;
            Arc::new(TimeSeries::new(data.time, data.values)?.with_unit(unit).with_name(name))
        }
        LoadMode::Lazy => {
            let raw = info.clone();
            let lazy = LazyTimeSeries::new(move || {
                let data = raw.load(false)?;
                Ok((data.time, data.values))
            });
            Arc::new(lazy.with_unit(unit).with_name(name))
        }
    };

    Channel::from_shared(info.logical_name.clone(), series, meta)
}

/// Attributes the file declares for the first segment of a channel.
fn source_attrs(reader: &MeasurementReader, info: &RawChannelInfo) -> Attrs {
    info.segments
        .first()
        .and_then(|seg| {
            reader
                .source()
                .groups()
                .get(seg.group_index)?
                .channels
                .get(seg.channel_index)
        })
        .map(|channel| channel.attrs.clone())
        .unwrap_or_default()
}

/// Load a measurement file with the default reader configuration.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    load_dataset_with(path, ReaderConfig::default(), LoadMode::Eager)
}

/// Open `path`, index it, and assemble one segment named after the file stem.
pub fn load_dataset_with(path: &Path, config: ReaderConfig, mode: LoadMode) -> Result<Dataset> {
    let reader = MeasurementReader::open(path, config)?;
    let segment_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("measurement");
    let source = path.display().to_string();
    assemble_dataset(&reader, segment_name, Some(&source), mode)
}
