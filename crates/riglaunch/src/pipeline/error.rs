use super::step::Step;

/// Non-fatal issues collected while the pipeline runs. None of them changes
/// the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// Stored state could not be read; defaults were used.
    StoreReadFailed { error: String },
    StoreWriteFailed { step: Step, error: String },
    /// Destination refresh failed and the previously resolved URL was kept.
    StaleDestination { error: String },
}
