//! Immutable time-series containers and a logical-channel reader for
//! segmented measurement files.
//!
//! ```no_run
//! use std::path::Path;
//! use rusty_mdf::io::load_dataset;
//!
//! let dataset = load_dataset(Path::new("run1.parquet"))?;
//! for (name, segment) in dataset.iter() {
//!     println!("{name}: {} channels", segment.len());
//! }
//! # Ok::<(), rusty_mdf::CoreError>(())
//! ```

pub mod config;
pub mod core;
pub mod io;

pub use config::ReaderConfig;
pub use self::core::{Channel, CoreError, Dataset, Segment, TimeSeries, TimeSeriesLike};
pub use io::{ChannelReader, MeasurementReader, ReadError};
