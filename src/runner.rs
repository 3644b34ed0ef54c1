//! Runner asíncrono del host.
//!
//! Los motores sólo avanzan un paso por llamada; aquí se repiten los steps
//! con una espera entre polls del mismo stage, hasta un estado terminal o
//! hasta agotar `max_polls`. Al terminar se notifica el resultado.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reco_core::{keys, FlowEngine, FlowError, PipelineContext, ResourceProvider, ResourceStatus, StepEngine, StorageAccess,
                TeardownEngine};
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::notify::{LogNotifier, Notification, Notifier};

/// Espera entre dos polls consecutivos del mismo stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Fixed(Duration),
    /// Se duplica en cada poll sin cambios, con tope `max`.
    Exponential { initial: Duration, max: Duration },
}

impl WaitPolicy {
    /// Espera antes del poll número `attempt` (0-based) dentro de un stage.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            WaitPolicy::Fixed(d) => d,
            WaitPolicy::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(attempt.min(31));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

pub struct FlowRunner {
    provision: FlowEngine,
    teardown: TeardownEngine,
    provision_wait: WaitPolicy,
    teardown_wait: WaitPolicy,
    max_polls: u32,
    notifier: Arc<dyn Notifier>,
}

impl FlowRunner {
    pub fn new(config: &AppConfig, provider: Arc<dyn ResourceProvider>, storage: Arc<dyn StorageAccess>) -> Self {
        let provision = FlowEngine::builder(Arc::clone(&provider)).storage(storage)
                                                                  .settings(config.engine_settings())
                                                                  .build();
        let teardown = FlowEngine::builder(provider).settings(config.engine_settings())
                                                    .build_teardown();
        Self { provision,
               teardown,
               provision_wait: config.provision_wait(),
               teardown_wait: config.teardown_wait(),
               max_polls: config.max_polls,
               notifier: Arc::new(LogNotifier) }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn provision_engine(&self) -> &FlowEngine {
        &self.provision
    }

    pub fn teardown_engine(&self) -> &TeardownEngine {
        &self.teardown
    }

    pub async fn provision(&mut self, ctx: PipelineContext) -> Result<PipelineContext, AppError> {
        drive(&mut self.provision, self.provision_wait, self.max_polls, self.notifier.as_ref(), ctx).await
    }

    pub async fn teardown(&mut self, ctx: PipelineContext) -> Result<PipelineContext, AppError> {
        drive(&mut self.teardown, self.teardown_wait, self.max_polls, self.notifier.as_ref(), ctx).await
    }
}

/// Repite `advance` hasta completar. Sólo duerme cuando el step no cambió de
/// stage; entrar a un stage nuevo reinicia el backoff.
pub async fn drive<S: StepEngine>(engine: &mut S,
                                  wait: WaitPolicy,
                                  max_polls: u32,
                                  notifier: &dyn Notifier,
                                  mut ctx: PipelineContext)
                                  -> Result<PipelineContext, AppError> {
    if ctx.is_completed() {
        return Err(FlowError::FlowCompleted.into());
    }
    let mut polls: u32 = 0;
    let mut attempt: u32 = 0;

    loop {
        let previous = ctx.stage().map(str::to_string);
        let next = match engine.advance(ctx.clone()) {
            Ok(next) => next,
            Err(err) => {
                let failed = failure_context(ctx, &err);
                notifier.notify(&Notification::failed(failed, err.clone())).await;
                return Err(err.into());
            }
        };

        if next.is_completed() {
            info!("runner:completed stage={} polls={polls}", next.stage().unwrap_or_default());
            notifier.notify(&Notification::succeeded(next.clone())).await;
            return Ok(next);
        }

        if next.stage() == previous.as_deref() {
            polls += 1;
            if polls > max_polls {
                let stage = next.stage().unwrap_or_default().to_string();
                warn!("runner:timeout stage={stage} polls={max_polls}");
                notifier.notify(&Notification::gave_up(next.clone())).await;
                return Err(AppError::Timeout { polls: max_polls,
                                               stage,
                                               context: Box::new(next) });
            }
            let delay = wait.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!("runner:wait stage={} attempt={attempt} delay_ms={}", next.stage().unwrap_or_default(), delay.as_millis());
            sleep(delay).await;
        } else {
            attempt = 0;
        }
        ctx = next;
    }
}

/// Contexto entregado al notifier cuando un step falla: fija el stage del
/// error y, si fue un fallo terminal, su estado.
fn failure_context(mut ctx: PipelineContext, err: &FlowError) -> PipelineContext {
    if let FlowError::StageFailed { stage, status } = err {
        match ResourceStatus::parse(status) {
            Some(s) => ctx.set_stage_status(stage, s),
            None => ctx.set(keys::STAGE, stage.as_str()),
        }
    } else if let Some(stage) = err.stage() {
        ctx.set(keys::STAGE, stage);
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_never_grows() {
        let w = WaitPolicy::Fixed(Duration::from_secs(60));
        assert_eq!(w.delay(0), Duration::from_secs(60));
        assert_eq!(w.delay(50), Duration::from_secs(60));
    }

    #[test]
    fn exponential_policy_doubles_up_to_cap() {
        let w = WaitPolicy::Exponential { initial: Duration::from_secs(5),
                                          max: Duration::from_secs(30) };
        let delays: Vec<u64> = (0..5).map(|a| w.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 30, 30]);
        assert_eq!(w.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn failure_context_carries_stage_and_status() {
        let ctx = PipelineContext::new().with("stage", "SOLUTION").with("status", "PENDING");
        let err = FlowError::StageFailed { stage: "SOLUTION".into(),
                                           status: "CREATE_FAILED".into() };
        let out = failure_context(ctx, &err);
        assert_eq!(out.stage(), Some("SOLUTION"));
        assert_eq!(out.status(), Some(ResourceStatus::CreateFailed));

        let err = FlowError::MissingField { stage: "DATASET".into(),
                                            field: "schema_arn".into() };
        let out = failure_context(PipelineContext::new(), &err);
        assert_eq!(out.stage(), Some("DATASET"));
    }
}
