//! Domain model: validated, immutable containers for measurement data.
//!
//! Architecture:
//! ```text
//!   ┌─────────────┐
//!   │   Dataset    │  segment name → Segment
//!   └─────────────┘
//!         │
//!         ▼
//!   ┌─────────────┐
//!   │   Segment    │  channel name → Channel   (one measurement run)
//!   └─────────────┘
//!         │
//!         ▼
//!   ┌─────────────┐
//!   │   Channel    │  name + series + ChannelMeta
//!   └─────────────┘
//!         │
//!         ▼
//!   ┌──────────────────────────────┐
//!   │ TimeSeriesLike                │  TimeSeries (eager) | LazyTimeSeries
//!   └──────────────────────────────┘
//! ```
//!
//! Nothing here knows about files; see [`crate::io`] for the reader side.

pub mod attrs;
pub mod channel;
pub mod dataset;
pub mod error;
pub mod metadata;
pub mod named;
pub mod segment;
pub mod timeseries;

pub use attrs::{AttrValue, Attrs};
pub use channel::Channel;
pub use dataset::Dataset;
pub use error::{CoreError, Result};
pub use metadata::{ChannelMeta, DatasetMeta, SegmentMeta};
pub use named::{IntoNames, Missing, Named};
pub use segment::Segment;
pub use timeseries::{Closed, LazyTimeSeries, SeriesLoader, TimeSeries, TimeSeriesLike};
