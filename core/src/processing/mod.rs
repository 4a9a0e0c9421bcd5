pub mod quality;
pub mod reducer;
pub mod valley;
pub mod vitals;
pub mod waveform;

pub use quality::QualityScorer;
pub use reducer::{ChannelMeans, FrameReducer};
pub use valley::ValleyDetector;
pub use vitals::VitalsEstimator;
pub use waveform::{sample_rate, WaveformBuffer};
