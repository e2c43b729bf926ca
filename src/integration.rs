//! Integration module for connecting detection backends and snapshot
//! consumers with the tracker.
//!
//! Detection models, video I/O, display and storage live outside this crate;
//! this module defines the traits they plug into.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, DetectorBackend};
pub use pipeline::{NullSink, SnapshotSink, TrackerPipeline};
