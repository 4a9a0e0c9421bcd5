pub mod analysis;
pub mod coordinator;
pub mod session;

pub use analysis::{AnalysisJob, AnalysisOutcome, AnalysisReport, Analyzer};
pub use coordinator::{PipelineCoordinator, TickOutcome};
pub use session::SessionState;
