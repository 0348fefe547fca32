use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::attribution::merge_deeplink;
use crate::error::StoreError;
use crate::gateway::NetworkGateway;
use crate::store::DataStore;

use super::config::PipelineConfig;
use super::context::{Outcome, PipelineContext, ACTIVE_MODE};
use super::error::PipelineWarning;
use super::progress::{ProgressEvent, ProgressReporter};
use super::step::{Step, StepFlow};

/// Decides where a launch goes. Steps run strictly in `Step::ORDER`; the
/// first one that halts ends the run.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn DataStore>,
    gateway: Arc<dyn NetworkGateway>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn DataStore>,
        gateway: Arc<dyn NetworkGateway>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
        }
    }

    /// Run the full chain against a fresh context.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> PipelineContext {
        let ctx = PipelineContext::new(self.config.permission_cooldown);
        self.run_with(ctx, progress).await
    }

    pub async fn run_with(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> PipelineContext {
        let span = info_span!("pipeline");
        async {
            for step in Step::ORDER {
                progress.report(ProgressEvent::StepStarted { step });
                let flow = self
                    .run_step(step, &mut ctx)
                    .instrument(info_span!("step", name = step.name()))
                    .await;

                if flow == StepFlow::Halt {
                    debug!(step = step.name(), outcome = ?ctx.outcome(), "Pipeline halted");
                    progress.report(ProgressEvent::StepHalted {
                        step,
                        outcome: ctx.outcome().clone(),
                    });
                    break;
                }
            }

            if !ctx.outcome().is_terminal() {
                warn!("Pipeline finished without an outcome, falling back to main");
                ctx.conclude(Outcome::GoToMain);
            }

            info!(
                outcome = ?ctx.outcome(),
                warnings = ctx.warnings.len(),
                "Pipeline completed"
            );
            progress.report(ProgressEvent::Completed {
                outcome: ctx.outcome().clone(),
            });
            ctx
        }
        .instrument(span)
        .await
    }

    async fn run_step(&self, step: Step, ctx: &mut PipelineContext) -> StepFlow {
        match step {
            Step::Load => self.step_load(ctx),
            Step::Validate => self.step_validate(ctx).await,
            Step::TempUrl => self.step_temp_url(ctx),
            Step::SavedUrl => self.step_saved_url(ctx),
            Step::Organic => self.step_organic(ctx).await,
            Step::Fetch => self.step_fetch(ctx).await,
            Step::Resolve => self.step_resolve(ctx),
        }
    }

    fn step_load(&self, ctx: &mut PipelineContext) -> StepFlow {
        match self.store.load() {
            Ok(data) => ctx.apply_stored(data),
            Err(e) => {
                warn!(error = %e, "Failed to read stored state, using defaults");
                ctx.warnings.push(PipelineWarning::StoreReadFailed {
                    error: e.to_string(),
                });
            }
        }
        StepFlow::Continue
    }

    async fn step_validate(&self, ctx: &mut PipelineContext) -> StepFlow {
        if !ctx.has_attribution() {
            return StepFlow::Continue;
        }
        match self.gateway.validate().await {
            Ok(true) => StepFlow::Continue,
            Ok(false) => {
                info!("Validation marker rejected the launch");
                ctx.conclude(Outcome::GoToMain)
            }
            Err(e) => {
                warn!(error = %e, "Validation request failed");
                ctx.conclude(Outcome::GoToMain)
            }
        }
    }

    fn step_temp_url(&self, ctx: &mut PipelineContext) -> StepFlow {
        match self.store.take_temp_url() {
            Ok(Some(url)) => {
                info!("Using URL delivered by a notification");
                ctx.resolved_url = Some(url.clone());
                let outcome = ctx.destination_outcome(url);
                ctx.conclude(outcome)
            }
            Ok(None) => StepFlow::Continue,
            Err(e) => {
                warn!(error = %e, "Failed to read the notification URL slot");
                StepFlow::Continue
            }
        }
    }

    fn step_saved_url(&self, ctx: &mut PipelineContext) -> StepFlow {
        if ctx.has_attribution() {
            return StepFlow::Continue;
        }
        match ctx.resolved_url.clone() {
            Some(url) => {
                let outcome = ctx.destination_outcome(url);
                ctx.conclude(outcome)
            }
            None => ctx.conclude(Outcome::GoToMain),
        }
    }

    async fn step_organic(&self, ctx: &mut PipelineContext) -> StepFlow {
        if !(ctx.is_first_run && ctx.is_organic()) {
            return StepFlow::Continue;
        }
        debug!(grace = ?self.config.organic_grace, "Organic first run, waiting before re-fetch");
        tokio::time::sleep(self.config.organic_grace).await;

        match self.gateway.fetch_attribution().await {
            Ok(fetched) => {
                ctx.attribution = merge_deeplink(&fetched, &ctx.deeplink);
                StepFlow::Continue
            }
            Err(e) => {
                warn!(error = %e, "Attribution re-fetch failed");
                ctx.conclude(Outcome::GoToMain)
            }
        }
    }

    async fn step_fetch(&self, ctx: &mut PipelineContext) -> StepFlow {
        match self.gateway.fetch_destination(&ctx.attribution).await {
            Ok(url) => {
                ctx.resolved_url = Some(url.clone());
                ctx.resolved_mode = Some(ACTIVE_MODE.to_string());
                ctx.is_first_run = false;
                self.persist_destination(ctx, &url);
                StepFlow::Continue
            }
            Err(e) if ctx.resolved_url.is_some() => {
                warn!(error = %e, "Destination refresh failed, keeping the stored URL");
                ctx.warnings.push(PipelineWarning::StaleDestination {
                    error: e.to_string(),
                });
                StepFlow::Continue
            }
            Err(e) => {
                warn!(error = %e, "Destination request failed");
                ctx.conclude(Outcome::GoToMain)
            }
        }
    }

    fn step_resolve(&self, ctx: &mut PipelineContext) -> StepFlow {
        match ctx.resolved_url.clone() {
            Some(url) => {
                let outcome = ctx.destination_outcome(url);
                ctx.conclude(outcome)
            }
            None => ctx.conclude(Outcome::GoToMain),
        }
    }

    fn persist_destination(&self, ctx: &mut PipelineContext, url: &str) {
        let writes: [Result<(), StoreError>; 3] = [
            self.store.save_url(url),
            self.store.save_mode(ACTIVE_MODE),
            self.store.mark_installed(),
        ];
        for result in writes {
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist resolved destination");
                ctx.warnings.push(PipelineWarning::StoreWriteFailed {
                    step: Step::Fetch,
                    error: e.to_string(),
                });
            }
        }
    }
}
