use super::error::{CoreError, Result};
use super::metadata::DatasetMeta;
use super::named::{IntoNames, Kind, Missing, Named, NamedMap};
use super::segment::Segment;
use super::timeseries::Closed;

const KIND: Kind = Kind {
    container: "Dataset",
    child: "Segment",
    invalid: CoreError::InvalidDataset,
    not_found: CoreError::SegmentNotFound,
};

/// A collection of segments, keyed by segment name.
///
/// ```text
/// Dataset
///  ├── "PowerCurve_01": Segment ── Channel("eng_spd"), Channel("torque"), ...
///  └── "Calibration":   Segment ── ...
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    segments: NamedMap<Segment>,
    meta: DatasetMeta,
}

impl Dataset {
    /// Build from `(key, segment)` pairs; every key must equal its segment's name.
    pub fn new<K, I>(segments: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Segment)>,
    {
        Self::with_meta(segments, DatasetMeta::default())
    }

    pub fn with_meta<K, I>(segments: I, meta: DatasetMeta) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Segment)>,
    {
        Ok(Self {
            segments: NamedMap::from_pairs(segments, KIND)?,
            meta,
        })
    }

    pub fn from_segments<I>(segments: I, meta: DatasetMeta) -> Result<Self>
    where
        I: IntoIterator<Item = Segment>,
    {
        Ok(Self {
            segments: NamedMap::from_children(segments, KIND)?,
            meta,
        })
    }

    fn derive(&self, segments: NamedMap<Segment>) -> Dataset {
        Dataset {
            segments,
            meta: self.meta.clone(),
        }
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn replace_meta(&self, meta: DatasetMeta) -> Dataset {
        Dataset {
            segments: self.segments.clone(),
            meta,
        }
    }

    // ---- mapping-style access ----

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.segments.contains(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|seg| seg.name())
    }

    pub fn values(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Segment)> {
        self.segments.iter().map(|seg| (seg.name(), seg))
    }

    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Like [`Dataset::get`] but fails with `SegmentNotFound`.
    pub fn segment(&self, name: &str) -> Result<&Segment> {
        self.segments.lookup(name, KIND)
    }

    // ---- derived time bounds ----

    pub fn t_start(&self) -> Result<Option<f64>> {
        let mut start: Option<f64> = None;
        for seg in self.segments.iter() {
            if let Some(t) = seg.t_start()? {
                start = Some(start.map_or(t, |s| s.min(t)));
            }
        }
        Ok(start)
    }

    pub fn t_end(&self) -> Result<Option<f64>> {
        let mut end: Option<f64> = None;
        for seg in self.segments.iter() {
            if let Some(t) = seg.t_end()? {
                end = Some(end.map_or(t, |e| e.max(t)));
            }
        }
        Ok(end)
    }

    // ---- transformations ----

    /// Fails with `InvalidDataset` if the segment exists and `overwrite` is false.
    pub fn add(&self, segment: Segment, overwrite: bool) -> Result<Dataset> {
        Ok(self.derive(self.segments.with(segment, overwrite, KIND)?))
    }

    pub fn drop(&self, names: impl IntoNames, missing: Missing) -> Result<Dataset> {
        Ok(self.derive(self.segments.without(&names.into_names(), missing, KIND)?))
    }

    /// Keep only `names`, in the order given.
    pub fn select(&self, names: impl IntoNames, missing: Missing) -> Result<Dataset> {
        Ok(self.derive(self.segments.only(&names.into_names(), missing, KIND)?))
    }

    /// Slice every segment.
    ///
    /// `drop_empty_channels` is forwarded to [`Segment::slice_time`];
    /// `drop_empty_segments` removes segments left with no channels.
    pub fn slice_time(
        &self,
        t_min: Option<f64>,
        t_max: Option<f64>,
        closed: Closed,
        drop_empty_segments: bool,
        drop_empty_channels: bool,
    ) -> Result<Dataset> {
        let mut sliced = Vec::with_capacity(self.segments.len());
        for seg in self.segments.iter() {
            let seg = seg.slice_time(t_min, t_max, closed, drop_empty_channels)?;
            if drop_empty_segments && seg.is_empty() {
                continue;
            }
            sliced.push(seg);
        }
        Ok(self.derive(NamedMap::from_valid(sliced)))
    }

    /// Rename a segment, keeping key and `Segment::name` consistent.
    pub fn rename_segment(&self, old: &str, new: &str) -> Result<Dataset> {
        let segments = self
            .segments
            .rekey(old, new, KIND, |seg| seg.rename(new))?;
        Ok(self.derive(segments))
    }

    /// Union by segment name. Without `overwrite` any collision fails;
    /// with it, segments of `other` win. Metadata of `self` is kept.
    pub fn merge(&self, other: &Dataset, overwrite: bool) -> Result<Dataset> {
        let mut segments = self.segments.clone();
        for seg in other.segments.iter() {
            if segments.contains(seg.name()) && !overwrite {
                return Err(CoreError::InvalidDataset(format!(
                    "Segment '{}' collides (overwrite=false)",
                    seg.name()
                )));
            }
            segments.upsert(seg.clone());
        }
        Ok(self.derive(segments))
    }
}
