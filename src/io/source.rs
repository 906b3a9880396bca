use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Attrs;

/// Element type a signal was recorded with, before widening to `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Float32,
    Float64,
    Integer,
    Boolean,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::Float32 => "float32",
            SampleType::Float64 => "float64",
            SampleType::Integer => "integer",
            SampleType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Per-channel attributes as declared by the measurement file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceChannel {
    pub name: String,
    pub unit: Option<String>,
    /// Declared sample count; zero marks a metadata (non time-series) entry.
    pub samples_count: usize,
    /// Recorder-assigned path, e.g. `Concerto/RecResult[2]`.
    pub source_path: Option<String>,
    pub sample_type: Option<SampleType>,
    /// First/last timestamp, when the file declares them.
    pub time_bounds: Option<(f64, f64)>,
    pub attrs: Attrs,
}

/// One group of channels sharing a position in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceGroup {
    pub channels: Vec<SourceChannel>,
}

/// Timestamps + samples of one physical signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signal {
    pub timestamps: Vec<f64>,
    pub samples: Vec<f64>,
}

/// A measurement file as seen by the reader: ordered groups of ordered
/// channels, addressed by position.
///
/// Implementations wrap the actual file parser. The reader holds one
/// shared, read-only handle for its whole lifetime and calls
/// [`MeasurementSource::get`] only when a signal's data is requested.
pub trait MeasurementSource: Send + Sync {
    fn groups(&self) -> &[SourceGroup];

    /// Read one signal by its `(group, channel)` position.
    fn get(&self, group: usize, channel: usize) -> anyhow::Result<Signal>;
}
