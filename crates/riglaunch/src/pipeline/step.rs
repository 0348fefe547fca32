/// Pipeline steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Load,
    Validate,
    TempUrl,
    SavedUrl,
    Organic,
    Fetch,
    Resolve,
}

impl Step {
    pub const ORDER: [Step; 7] = [
        Step::Load,
        Step::Validate,
        Step::TempUrl,
        Step::SavedUrl,
        Step::Organic,
        Step::Fetch,
        Step::Resolve,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Load => "load",
            Step::Validate => "validate",
            Step::TempUrl => "temp_url",
            Step::SavedUrl => "saved_url",
            Step::Organic => "organic",
            Step::Fetch => "fetch",
            Step::Resolve => "resolve",
        }
    }
}

/// What a step tells the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlow {
    Continue,
    Halt,
}
