use super::channel::Channel;
use super::error::{CoreError, Result};
use super::metadata::SegmentMeta;
use super::named::{check_name, IntoNames, Kind, Missing, Named, NamedMap};
use super::timeseries::Closed;

const KIND: Kind = Kind {
    container: "Segment",
    child: "Channel",
    invalid: CoreError::InvalidSegment,
    not_found: CoreError::ChannelNotFound,
};

/// One coherent measurement / run holding several channels.
///
/// Channels are kept in insertion order and keyed by their own names.
/// All transformations return a new segment with copied metadata.
#[derive(Debug, Clone)]
pub struct Segment {
    name: String,
    channels: NamedMap<Channel>,
    meta: SegmentMeta,
}

impl Segment {
    /// Build from `(key, channel)` pairs; every key must equal its channel's name.
    pub fn new<K, I>(name: impl Into<String>, channels: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Channel)>,
    {
        Self::with_meta(name, channels, SegmentMeta::default())
    }

    pub fn with_meta<K, I>(name: impl Into<String>, channels: I, meta: SegmentMeta) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Channel)>,
    {
        let name = name.into();
        check_name(&name, "Segment.name", CoreError::InvalidSegment)?;
        let channels = NamedMap::from_pairs(channels, KIND)?;
        Ok(Self { name, channels, meta })
    }

    /// Build keyed by each channel's own name.
    pub fn from_channels<I>(name: impl Into<String>, channels: I, meta: SegmentMeta) -> Result<Self>
    where
        I: IntoIterator<Item = Channel>,
    {
        let name = name.into();
        check_name(&name, "Segment.name", CoreError::InvalidSegment)?;
        let channels = NamedMap::from_children(channels, KIND)?;
        Ok(Self { name, channels, meta })
    }

    fn derive(&self, channels: NamedMap<Channel>) -> Segment {
        Segment {
            name: self.name.clone(),
            channels,
            meta: self.meta.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    // ---- mapping-style access ----

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|ch| ch.name())
    }

    pub fn values(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|ch| (ch.name(), ch))
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Like [`Segment::get`] but fails with `ChannelNotFound`.
    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels.lookup(name, KIND)
    }

    // ---- derived time bounds ----

    pub fn t_start(&self) -> Result<Option<f64>> {
        let mut start: Option<f64> = None;
        for ch in self.channels.iter() {
            if let Some(t) = ch.t_start()? {
                start = Some(start.map_or(t, |s| s.min(t)));
            }
        }
        Ok(start)
    }

    pub fn t_end(&self) -> Result<Option<f64>> {
        let mut end: Option<f64> = None;
        for ch in self.channels.iter() {
            if let Some(t) = ch.t_end()? {
                end = Some(end.map_or(t, |e| e.max(t)));
            }
        }
        Ok(end)
    }

    // ---- transformations ----

    /// Fails with `InvalidSegment` if the channel exists and `overwrite` is false.
    pub fn add(&self, channel: Channel, overwrite: bool) -> Result<Segment> {
        Ok(self.derive(self.channels.with(channel, overwrite, KIND)?))
    }

    pub fn drop(&self, names: impl IntoNames, missing: Missing) -> Result<Segment> {
        Ok(self.derive(self.channels.without(&names.into_names(), missing, KIND)?))
    }

    /// Keep only `names`, in the order given.
    pub fn select(&self, names: impl IntoNames, missing: Missing) -> Result<Segment> {
        Ok(self.derive(self.channels.only(&names.into_names(), missing, KIND)?))
    }

    /// Slice every channel; with `drop_empty` channels left without samples are removed.
    pub fn slice_time(
        &self,
        t_min: Option<f64>,
        t_max: Option<f64>,
        closed: Closed,
        drop_empty: bool,
    ) -> Result<Segment> {
        let mut sliced = Vec::with_capacity(self.channels.len());
        for ch in self.channels.iter() {
            let ch = ch.slice_time(t_min, t_max, closed)?;
            if drop_empty && ch.n()? == 0 {
                continue;
            }
            sliced.push(ch);
        }
        Ok(self.derive(NamedMap::from_valid(sliced)))
    }

    pub fn rename(&self, name: &str) -> Result<Segment> {
        check_name(name, "Segment.name", CoreError::InvalidSegment)?;
        Ok(Segment {
            name: name.to_string(),
            channels: self.channels.clone(),
            meta: self.meta.clone(),
        })
    }

    pub fn replace_meta(&self, meta: SegmentMeta) -> Segment {
        Segment {
            name: self.name.clone(),
            channels: self.channels.clone(),
            meta,
        }
    }
}

impl Named for Segment {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timeseries::TimeSeries;

    fn channel(name: &str, time: &[f64]) -> Channel {
        let values: Vec<f64> = time.iter().map(|t| t * 10.0).collect();
        Channel::new(name, TimeSeries::new(time.to_vec(), values).unwrap()).unwrap()
    }

    fn segment() -> Segment {
        Segment::from_channels(
            "run_01",
            [
                channel("a", &[0.0, 1.0, 2.0]),
                channel("b", &[5.0, 6.0]),
                channel("c", &[1.0, 9.0]),
            ],
            SegmentMeta::default().with_kind(Some("calibration")),
        )
        .unwrap()
    }

    fn keys(seg: &Segment) -> Vec<&str> {
        seg.keys().collect()
    }

    #[test]
    fn key_must_match_channel_name() {
        let err = Segment::new("S", [("x", channel("a", &[0.0]))]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSegment(_)));
    }

    #[test]
    fn blank_segment_name_is_rejected() {
        let err = Segment::new("", Vec::<(String, Channel)>::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSegment(_)));
    }

    #[test]
    fn lookup_missing_channel() {
        let seg = segment();
        assert!(seg.get("zzz").is_none());
        let err = seg.channel("zzz").unwrap_err();
        assert!(matches!(err, CoreError::ChannelNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn time_bounds_span_all_channels() {
        let seg = segment();
        assert_eq!(seg.t_start().unwrap(), Some(0.0));
        assert_eq!(seg.t_end().unwrap(), Some(9.0));

        let empty = Segment::new("E", Vec::<(String, Channel)>::new()).unwrap();
        assert_eq!(empty.t_start().unwrap(), None);
        assert_eq!(empty.t_end().unwrap(), None);
    }

    #[test]
    fn add_respects_overwrite() {
        let seg = segment();
        let err = seg.add(channel("a", &[3.0]), false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSegment(_)));

        let replaced = seg.add(channel("a", &[3.0]), true).unwrap();
        assert_eq!(replaced.channel("a").unwrap().n().unwrap(), 1);
        assert_eq!(seg.channel("a").unwrap().n().unwrap(), 3);

        let added = seg.add(channel("d", &[3.0]), false).unwrap();
        assert_eq!(keys(&added), vec!["a", "b", "c", "d"]);
        assert_eq!(added.meta(), seg.meta());
    }

    #[test]
    fn drop_twice_fails_second_time() {
        let seg = Segment::new("S", [("a", channel("a", &[0.0]))]).unwrap();
        let dropped = seg.drop("a", Missing::Raise).unwrap();
        assert!(dropped.is_empty());
        let err = dropped.drop("a", Missing::Raise).unwrap_err();
        assert!(matches!(err, CoreError::ChannelNotFound(ref n) if n == "a"));
    }

    #[test]
    fn drop_ignore_is_noop_for_absent() {
        let seg = segment();
        let same = seg.drop(["zzz"], Missing::Ignore).unwrap();
        assert_eq!(keys(&same), keys(&seg));

        let fewer = seg.drop(vec!["a", "zzz"], Missing::Ignore).unwrap();
        assert_eq!(keys(&fewer), vec!["b", "c"]);
    }

    #[test]
    fn select_uses_requested_order() {
        let seg = segment();
        let picked = seg.select(["c", "a"], Missing::Raise).unwrap();
        assert_eq!(keys(&picked), vec!["c", "a"]);

        assert!(seg.select(["c", "zzz"], Missing::Raise).is_err());
        let lenient = seg.select(["zzz", "b"], Missing::Ignore).unwrap();
        assert_eq!(keys(&lenient), vec!["b"]);
    }

    #[test]
    fn slice_time_keeps_or_drops_empty_channels() {
        let seg = segment();

        let kept = seg.slice_time(Some(0.0), Some(2.0), Closed::Both, false).unwrap();
        assert_eq!(keys(&kept), vec!["a", "b", "c"]);
        assert_eq!(kept.channel("b").unwrap().n().unwrap(), 0);

        let dropped = seg.slice_time(Some(0.0), Some(2.0), Closed::Both, true).unwrap();
        assert_eq!(keys(&dropped), vec!["a", "c"]);
        assert_eq!(dropped.channel("a").unwrap().n().unwrap(), 3);
        assert_eq!(dropped.meta(), seg.meta());
    }

    #[test]
    fn rename_preserves_channels() {
        let seg = segment();
        let renamed = seg.rename("run_02").unwrap();
        assert_eq!(renamed.name(), "run_02");
        assert_eq!(keys(&renamed), keys(&seg));
        assert_eq!(seg.name(), "run_01");
        assert!(seg.rename(" ").is_err());
    }
}
