use thiserror::Error;

/// Errors of the logical-channel reader.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The logical index has no channel of that name.
    #[error("Channel '{0}' not found in measurement file (by logical name)")]
    ChannelNotFound(String),

    /// Failure inside the measurement source, passed through unchanged.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl ReadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadError::ChannelNotFound(_))
    }
}
