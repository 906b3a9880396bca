use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::bail;

use super::error::ReadError;
use super::file::MeasurementFile;
use super::naming::{extract_measurement_name, parse_key_and_index};
use super::source::{MeasurementSource, SampleType};
use crate::config::ReaderConfig;

/// Zero-argument loader of one physical signal: `(time, values)`.
pub type SignalLoader = Arc<dyn Fn() -> anyhow::Result<(Vec<f64>, Vec<f64>)> + Send + Sync>;

// ---------------------------------------------------------------------------
// Raw model
// ---------------------------------------------------------------------------

/// One physical recording of a channel, e.g. `eng_spd` under `RecResult[2]`.
#[derive(Clone)]
pub struct RawSegmentInfo {
    /// `"RecResult[1]"`, `"D[3]"`, `"SomeOtherKey"`, ...
    pub measurement_name: String,
    pub key: String,
    pub index: Option<u32>,
    pub source_path: String,
    pub channel_name: String,
    pub unit: Option<String>,
    pub n_samples: usize,
    pub t_start: Option<f64>,
    pub t_end: Option<f64>,
    pub group_index: usize,
    pub channel_index: usize,
    pub sample_type: Option<SampleType>,
    /// Reads only this segment's signal when called.
    pub loader: SignalLoader,
}

impl RawSegmentInfo {
    pub fn load(&self) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
        (self.loader)()
    }

    /// Index used for ordering and provenance; -1 when the name has none.
    pub fn measure_id(&self) -> i64 {
        self.index.map_or(-1, i64::from)
    }
}

impl fmt::Debug for RawSegmentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSegmentInfo")
            .field("measurement_name", &self.measurement_name)
            .field("key", &self.key)
            .field("index", &self.index)
            .field("channel_name", &self.channel_name)
            .field("unit", &self.unit)
            .field("n_samples", &self.n_samples)
            .field("group_index", &self.group_index)
            .field("channel_index", &self.channel_index)
            .finish_non_exhaustive()
    }
}

/// Inclusive time window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeWindow {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn between(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn starting_at(start: f64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn ending_at(end: f64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e)
    }
}

/// Concatenated samples of a logical channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChannelData {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
    /// Per-sample index of the originating segment (-1 if it had none),
    /// present when requested.
    pub measure_id: Option<Vec<i64>>,
}

fn masked<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

impl RawChannelData {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Keep the samples inside `window`, masking every array jointly.
    pub fn window(self, window: TimeWindow) -> Self {
        if window.is_full() {
            return self;
        }
        let keep: Vec<bool> = self.time.iter().map(|&t| window.contains(t)).collect();
        Self {
            time: masked(self.time, &keep),
            values: masked(self.values, &keep),
            measure_id: self.measure_id.map(|ids| masked(ids, &keep)),
        }
    }
}

/// A logical channel under one recorder key, spanning its ordered segments.
///
/// `("eng_spd", "RecResult")` is the concatenation of `RecResult[1..N]`;
/// `("eng_spd", "D")` the concatenation of `D[1..M]`.
#[derive(Debug, Clone)]
pub struct RawChannelInfo {
    pub logical_name: String,
    pub key: String,
    /// Ascending by index; segments without one come first.
    pub segments: Vec<RawSegmentInfo>,
    pub unit: Option<String>,
    pub dtype: Option<SampleType>,
}

impl RawChannelInfo {
    /// Declared sample count across all segments, saturating.
    ///
    /// Reported by the source, not checked against the data.
    pub fn n_samples(&self) -> usize {
        self.segments
            .iter()
            .fold(0usize, |acc, s| acc.saturating_add(s.n_samples))
    }

    /// Load every segment in order and concatenate.
    ///
    /// With `with_measure_id` the result also tags each sample with its
    /// segment index. Source errors are returned as the source raised them.
    pub fn load(&self, with_measure_id: bool) -> anyhow::Result<RawChannelData> {
        // Sized by what the loaders return, never by declared counts.
        let mut time: Vec<f64> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut ids: Option<Vec<i64>> = with_measure_id.then(Vec::new);

        for seg in &self.segments {
            let (t, v) = seg.load()?;
            if t.len() != v.len() {
                bail!(
                    "segment {} of channel '{}' returned {} timestamps but {} samples",
                    seg.measurement_name,
                    self.logical_name,
                    t.len(),
                    v.len()
                );
            }
            if let Some(ids) = ids.as_mut() {
                ids.extend(std::iter::repeat(seg.measure_id()).take(t.len()));
            }
            time.extend(t);
            values.extend(v);
        }

        log::debug!(
            "loaded {}:{} from {} segment(s), {} samples",
            self.key,
            self.logical_name,
            self.segments.len(),
            time.len()
        );

        Ok(RawChannelData {
            time,
            values,
            measure_id: ids,
        })
    }
}

/// A file entry without time-series samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaChannelInfo {
    pub group_index: usize,
    pub channel_index: usize,
    pub name: String,
    pub unit: Option<String>,
    pub n_samples: usize,
    pub source_path: Option<String>,
}

// ---------------------------------------------------------------------------
// ChannelReader – logical view of a measurement file
// ---------------------------------------------------------------------------

pub trait ChannelReader {
    /// One entry per logical name, with the default key variant.
    fn list_channels(&self) -> Vec<&RawChannelInfo>;

    /// Load the named logical channels, optionally windowed in time.
    fn read_channels(
        &self,
        names: &[&str],
        window: TimeWindow,
    ) -> Result<BTreeMap<String, RawChannelData>, ReadError>;
}

/// Indexes a [`MeasurementSource`] into logical channels.
///
/// The source is scanned once on construction; no signal data is read
/// until a channel is loaded.
pub struct MeasurementReader {
    source: Arc<dyn MeasurementSource>,
    config: ReaderConfig,
    /// Every (key, name) variant, in first-encounter order.
    channels: Vec<RawChannelInfo>,
    by_key_name: HashMap<(String, String), usize>,
    /// Logical names in first-encounter order.
    names: Vec<String>,
    /// Logical name → default variant.
    logical_index: HashMap<String, usize>,
    meta_channels: Vec<MetaChannelInfo>,
}

fn bind_loader(source: &Arc<dyn MeasurementSource>, group: usize, channel: usize) -> SignalLoader {
    let source = Arc::clone(source);
    Arc::new(move || {
        let signal = source.get(group, channel)?;
        Ok((signal.timestamps, signal.samples))
    })
}

impl MeasurementReader {
    pub fn new(source: Arc<dyn MeasurementSource>, config: ReaderConfig) -> Self {
        let mut reader = Self {
            source,
            config,
            channels: Vec::new(),
            by_key_name: HashMap::new(),
            names: Vec::new(),
            logical_index: HashMap::new(),
            meta_channels: Vec::new(),
        };
        reader.build_index();
        reader
    }

    /// Open a measurement file from disk and index it.
    pub fn open(path: &Path, config: ReaderConfig) -> anyhow::Result<Self> {
        let file = MeasurementFile::open(path)?;
        Ok(Self::new(Arc::new(file), config))
    }

    fn build_index(&mut self) {
        let mut buckets: Vec<((String, String), Vec<RawSegmentInfo>)> = Vec::new();
        let mut bucket_pos: HashMap<(String, String), usize> = HashMap::new();

        for (group_index, group) in self.source.groups().iter().enumerate() {
            for (channel_index, channel) in group.channels.iter().enumerate() {
                if channel.samples_count == 0 {
                    self.meta_channels.push(MetaChannelInfo {
                        group_index,
                        channel_index,
                        name: channel.name.clone(),
                        unit: channel.unit.clone(),
                        n_samples: 0,
                        source_path: channel.source_path.clone(),
                    });
                    continue;
                }

                let source_path = channel.source_path.clone().unwrap_or_default();
                let measurement_name = extract_measurement_name(&source_path).to_string();
                let (key, index) = parse_key_and_index(&measurement_name);

                let segment = RawSegmentInfo {
                    measurement_name,
                    key: key.clone(),
                    index,
                    channel_name: channel.name.clone(),
                    unit: channel.unit.clone(),
                    n_samples: channel.samples_count,
                    t_start: channel.time_bounds.map(|(start, _)| start),
                    t_end: channel.time_bounds.map(|(_, end)| end),
                    group_index,
                    channel_index,
                    sample_type: channel.sample_type,
                    loader: bind_loader(&self.source, group_index, channel_index),
                    source_path,
                };

                let id = (key, channel.name.clone());
                match bucket_pos.get(&id) {
                    Some(&pos) => buckets[pos].1.push(segment),
                    None => {
                        bucket_pos.insert(id.clone(), buckets.len());
                        buckets.push((id, vec![segment]));
                    }
                }
            }
        }

        for ((key, name), mut segments) in buckets {
            // Stable: equal indices keep file order.
            segments.sort_by_key(RawSegmentInfo::measure_id);
            let unit = segments.first().and_then(|s| s.unit.clone());
            let dtype = segments.first().and_then(|s| s.sample_type);

            self.by_key_name
                .insert((key.clone(), name.clone()), self.channels.len());
            self.channels.push(RawChannelInfo {
                logical_name: name,
                key,
                segments,
                unit,
                dtype,
            });
        }

        for (pos, info) in self.channels.iter().enumerate() {
            match self.logical_index.get(&info.logical_name) {
                None => {
                    self.names.push(info.logical_name.clone());
                    self.logical_index.insert(info.logical_name.clone(), pos);
                }
                Some(&current) => {
                    let rank = self.config.key_rank(&info.key);
                    let current_rank = self.config.key_rank(&self.channels[current].key);
                    let preferred = match (rank, current_rank) {
                        (Some(r), Some(c)) => r < c,
                        (Some(_), None) => true,
                        _ => false,
                    };
                    if preferred {
                        self.logical_index.insert(info.logical_name.clone(), pos);
                    }
                }
            }
        }

        log::info!(
            "indexed {} logical channel(s) from {} variant(s); {} metadata channel(s) skipped",
            self.names.len(),
            self.channels.len(),
            self.meta_channels.len()
        );
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn MeasurementSource> {
        &self.source
    }

    /// Entries identified as non time-series (zero declared samples).
    pub fn list_metadata_channels(&self) -> &[MetaChannelInfo] {
        &self.meta_channels
    }

    /// Default variant of a logical channel.
    pub fn channel(&self, name: &str) -> Option<&RawChannelInfo> {
        self.logical_index.get(name).map(|&pos| &self.channels[pos])
    }

    pub fn channel_by_key(&self, key: &str, name: &str) -> Option<&RawChannelInfo> {
        self.by_key_name
            .get(&(key.to_string(), name.to_string()))
            .map(|&pos| &self.channels[pos])
    }

    /// Every key variant of a logical name, in first-encounter order.
    pub fn variants(&self, name: &str) -> Vec<&RawChannelInfo> {
        self.channels
            .iter()
            .filter(|info| info.logical_name == name)
            .collect()
    }

    /// Distinct recorder keys, in first-encounter order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for info in &self.channels {
            if !keys.contains(&info.key.as_str()) {
                keys.push(&info.key);
            }
        }
        keys
    }

    /// Load one logical channel by name.
    pub fn read_channel(
        &self,
        name: &str,
        window: TimeWindow,
        with_measure_id: bool,
    ) -> Result<RawChannelData, ReadError> {
        let info = self
            .channel(name)
            .ok_or_else(|| ReadError::ChannelNotFound(name.to_string()))?;
        Ok(info.load(with_measure_id)?.window(window))
    }
}

impl ChannelReader for MeasurementReader {
    fn list_channels(&self) -> Vec<&RawChannelInfo> {
        self.names
            .iter()
            .map(|name| &self.channels[self.logical_index[name]])
            .collect()
    }

    fn read_channels(
        &self,
        names: &[&str],
        window: TimeWindow,
    ) -> Result<BTreeMap<String, RawChannelData>, ReadError> {
        let mut result = BTreeMap::new();
        for &name in names {
            let data = self.read_channel(name, window, false)?;
            result.insert(name.to_string(), data);
        }
        Ok(result)
    }
}

impl fmt::Debug for MeasurementReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementReader")
            .field("config", &self.config)
            .field("logical_channels", &self.names)
            .field("variants", &self.channels.len())
            .field("meta_channels", &self.meta_channels.len())
            .finish()
    }
}
