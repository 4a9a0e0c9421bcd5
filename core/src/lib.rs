//! Core signal processing for camera-based pulse measurement.
//!
//! Frames are reduced to one sample each, kept in a bounded waveform, and periodically
//! analysed for pulse valleys, heart rate, SDNN and signal quality. Frame capture, record
//! persistence and display sit behind the traits in [`interface`].

pub mod interface;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use pipeline::{PipelineCoordinator, SessionState, TickOutcome};
pub use prelude::{PipelineConfig, PipelineError, PipelineResult};
