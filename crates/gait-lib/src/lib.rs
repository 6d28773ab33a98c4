pub mod classify;
pub mod config;
pub mod dataset;
pub mod detectors;
pub mod error;
pub mod features;
pub mod io;
pub mod pipeline;
pub mod repair;
pub mod segments;
pub mod signal;

pub use config::PipelineConfig;
pub use dataset::{FeatureRecord, FeatureTable};
pub use detectors::*;
pub use error::FeatureError;
pub use features::*;
pub use segments::{Segment, SegmentError};
pub use signal::*;
