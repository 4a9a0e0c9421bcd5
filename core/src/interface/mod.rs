pub mod display;
pub mod frame;
pub mod record;

pub use display::{DisplaySink, DisplayView};
pub use frame::{Frame, FrameSource, Roi};
pub use record::{ChannelSink, PersistenceSink, VitalsRecord};
