//! Reader side: measurement files → logical channels → datasets.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌─────────────────┐
//!   │ MeasurementFile  │  groups of channels, addressed by position
//!   └─────────────────┘
//!        │  MeasurementSource
//!        ▼
//!   ┌───────────────────┐
//!   │ MeasurementReader  │  source path → (key, index), bucket by (key, name),
//!   └───────────────────┘  pick the default key per logical name
//!        │
//!        ▼
//!   ┌──────────┐
//!   │   load    │  RawChannelInfo → TimeSeries / LazyTimeSeries → Dataset
//!   └──────────┘
//! ```

pub mod error;
pub mod file;
pub mod load;
pub mod naming;
pub mod reader;
pub mod source;

pub use error::ReadError;
pub use file::{ChannelRecord, MeasurementFile};
pub use load::{assemble_dataset, load_dataset, load_dataset_with, LoadMode, IMPORT_KIND};
pub use naming::{extract_measurement_name, parse_key_and_index};
pub use reader::{
    ChannelReader, MeasurementReader, MetaChannelInfo, RawChannelData, RawChannelInfo,
    RawSegmentInfo, SignalLoader, TimeWindow,
};
pub use source::{MeasurementSource, SampleType, Signal, SourceChannel, SourceGroup};
