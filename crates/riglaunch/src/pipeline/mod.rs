pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod step;

pub use config::PipelineConfig;
pub use context::{Outcome, PipelineContext};
pub use error::PipelineWarning;
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
pub use step::{Step, StepFlow};
