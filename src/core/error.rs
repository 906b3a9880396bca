use thiserror::Error;

/// Root error of the domain model.
///
/// Construction errors (`Invalid*`) are raised before a value exists, so a
/// failed call never leaves a half-built container behind. Lookup errors
/// (`*NotFound`) also answer [`CoreError::is_not_found`] and
/// [`CoreError::missing_key`] so they can be handled like a plain missing
/// key in a map.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid time series: {0}")]
    InvalidTimeSeries(String),

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("channel not found: '{0}'")]
    ChannelNotFound(String),

    #[error("segment not found: '{0}'")]
    SegmentNotFound(String),

    /// An option string (slice boundary, missing policy, ...) was not recognised.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A deferred loader failed; the loader's error is passed through as-is.
    #[error(transparent)]
    Load(#[from] anyhow::Error),
}

impl CoreError {
    /// True for lookup failures on a missing name.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::ChannelNotFound(_) | CoreError::SegmentNotFound(_))
    }

    /// The name that was looked up, for lookup failures.
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            CoreError::ChannelNotFound(name) | CoreError::SegmentNotFound(name) => Some(name),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
