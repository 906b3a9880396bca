use super::attrs::{AttrValue, Attrs};

// ---------------------------------------------------------------------------
// ChannelMeta
// ---------------------------------------------------------------------------

/// Metadata attached to a [`Channel`](super::Channel).
///
/// * `unit` – display / physical unit (rpm, Nm, ...)
/// * `description` – human-friendly description
/// * `source` – origin of the signal (ECU, sensor, computed, ...)
/// * `attrs` – anything else
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMeta {
    pub unit: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub attrs: Attrs,
}

impl ChannelMeta {
    /// `attrs: None` is the same as an empty bag.
    pub fn new(
        unit: Option<String>,
        description: Option<String>,
        source: Option<String>,
        attrs: Option<Attrs>,
    ) -> Self {
        Self {
            unit,
            description,
            source,
            attrs: attrs.unwrap_or_default(),
        }
    }

    pub fn with_unit(&self, unit: Option<&str>) -> Self {
        Self {
            unit: unit.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_description(&self, description: Option<&str>) -> Self {
        Self {
            description: description.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: Option<&str>) -> Self {
        Self {
            source: source.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_attr(&self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let mut meta = self.clone();
        meta.attrs.insert(key.into(), value.into());
        meta
    }
}

// ---------------------------------------------------------------------------
// SegmentMeta
// ---------------------------------------------------------------------------

/// Metadata attached to a [`Segment`](super::Segment), i.e. one run.
///
/// Typical kinds: `power_curve`, `calibration`, `mdf_import`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentMeta {
    pub kind: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub attrs: Attrs,
}

impl SegmentMeta {
    pub fn new(
        kind: Option<String>,
        description: Option<String>,
        source: Option<String>,
        attrs: Option<Attrs>,
    ) -> Self {
        Self {
            kind,
            description,
            source,
            attrs: attrs.unwrap_or_default(),
        }
    }

    pub fn with_kind(&self, kind: Option<&str>) -> Self {
        Self {
            kind: kind.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_description(&self, description: Option<&str>) -> Self {
        Self {
            description: description.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: Option<&str>) -> Self {
        Self {
            source: source.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_attr(&self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let mut meta = self.clone();
        meta.attrs.insert(key.into(), value.into());
        meta
    }
}

// ---------------------------------------------------------------------------
// DatasetMeta
// ---------------------------------------------------------------------------

/// Metadata attached to a [`Dataset`](super::Dataset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetMeta {
    pub description: Option<String>,
    pub source: Option<String>,
    pub attrs: Attrs,
}

impl DatasetMeta {
    pub fn new(description: Option<String>, source: Option<String>, attrs: Option<Attrs>) -> Self {
        Self {
            description,
            source,
            attrs: attrs.unwrap_or_default(),
        }
    }

    pub fn with_description(&self, description: Option<&str>) -> Self {
        Self {
            description: description.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: Option<&str>) -> Self {
        Self {
            source: source.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_attr(&self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let mut meta = self.clone();
        meta.attrs.insert(key.into(), value.into());
        meta
    }
}
