use std::sync::Arc;

use super::error::{CoreError, Result};
use super::metadata::ChannelMeta;
use super::named::{check_name, Named};
use super::timeseries::{Closed, TimeSeriesLike};

/// A logical signal: name + series + metadata.
///
/// When `meta.unit` is not given, the series unit is copied into the
/// metadata while the channel is built. The copy is one-time; the channel
/// never observes later changes to another series.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    series: Arc<dyn TimeSeriesLike>,
    meta: ChannelMeta,
}

impl Channel {
    pub fn new<S>(name: impl Into<String>, series: S) -> Result<Self>
    where
        S: TimeSeriesLike + 'static,
    {
        Self::from_shared(name, Arc::new(series), ChannelMeta::default())
    }

    pub fn with_meta<S>(name: impl Into<String>, series: S, meta: ChannelMeta) -> Result<Self>
    where
        S: TimeSeriesLike + 'static,
    {
        Self::from_shared(name, Arc::new(series), meta)
    }

    /// Build around a series that may already be shared with other channels.
    pub fn from_shared(
        name: impl Into<String>,
        series: Arc<dyn TimeSeriesLike>,
        meta: ChannelMeta,
    ) -> Result<Self> {
        let name = name.into();
        check_name(&name, "Channel.name", CoreError::InvalidChannel)?;

        let meta = inherit_unit(meta, series.as_ref());
        Ok(Self { name, series, meta })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> &Arc<dyn TimeSeriesLike> {
        &self.series
    }

    pub fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    /// Metadata unit if set, otherwise the series unit.
    pub fn unit(&self) -> Option<&str> {
        self.meta.unit.as_deref().or_else(|| self.series.unit())
    }

    pub fn is_loaded(&self) -> bool {
        self.series.is_loaded()
    }

    pub fn time(&self) -> Result<&[f64]> {
        self.series.time()
    }

    pub fn values(&self) -> Result<&[f64]> {
        self.series.values()
    }

    pub fn n(&self) -> Result<usize> {
        self.series.n()
    }

    pub fn t_start(&self) -> Result<Option<f64>> {
        self.series.t_start()
    }

    pub fn t_end(&self) -> Result<Option<f64>> {
        self.series.t_end()
    }

    pub fn to_arrays(&self, copy: bool) -> Result<(Arc<[f64]>, Arc<[f64]>)> {
        self.series.to_arrays(copy)
    }

    pub fn slice_time(&self, t_min: Option<f64>, t_max: Option<f64>, closed: Closed) -> Result<Channel> {
        let series = self.series.slice_time(t_min, t_max, closed)?;
        Self::from_shared(self.name.clone(), Arc::new(series), self.meta.clone())
    }

    pub fn rename(&self, name: &str) -> Result<Channel> {
        Self::from_shared(name, Arc::clone(&self.series), self.meta.clone())
    }

    /// Override the unit at metadata level. `None` falls back to the series unit.
    pub fn with_unit(&self, unit: Option<&str>) -> Channel {
        self.rebuilt(self.meta.with_unit(unit))
    }

    pub fn with_description(&self, description: Option<&str>) -> Channel {
        self.rebuilt(self.meta.with_description(description))
    }

    pub fn with_source(&self, source: Option<&str>) -> Channel {
        self.rebuilt(self.meta.with_source(source))
    }

    fn rebuilt(&self, meta: ChannelMeta) -> Channel {
        Channel {
            name: self.name.clone(),
            series: Arc::clone(&self.series),
            meta: inherit_unit(meta, self.series.as_ref()),
        }
    }
}

fn inherit_unit(meta: ChannelMeta, series: &dyn TimeSeriesLike) -> ChannelMeta {
    if meta.unit.is_none() && series.unit().is_some() {
        meta.with_unit(series.unit())
    } else {
        meta
    }
}

impl Named for Channel {
    fn name(&self) -> &str {
        &self.name
    }
}
