//! Readiness Poller.
//!
//! Una invocación = un chequeo no bloqueante. Esperar entre chequeos es
//! responsabilidad del host (ver `recoflow::runner`).

use log::{debug, warn};

use crate::errors::FlowError;
use crate::model::PipelineContext;
use crate::provider::ResourceProvider;
use crate::stage::{Readiness, ResourceStatus, StageDescriptor};

/// Resultado agregado del poll de un stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub status: ResourceStatus,
    pub readiness: Readiness,
    /// Número de `describe` emitidos (0 para stages omitidos).
    pub described: usize,
}

impl PollReport {
    fn synthetic(descriptor: &StageDescriptor) -> Self {
        Self { status: descriptor.success,
               readiness: Readiness::Ready,
               described: 0 }
    }
}

pub struct ReadinessPoller<'a> {
    provider: &'a dyn ResourceProvider,
}

impl<'a> ReadinessPoller<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self { provider }
    }

    /// Consulta los handles del stage y clasifica contra su conjunto
    /// terminal. Un fallo en cualquier handle gana; el stage está listo sólo
    /// cuando todos lo están.
    ///
    /// Un stage omitido reporta su éxito terminal sin llamar al backend. Un
    /// handle vacío (rama opcional no tomada) tampoco se consulta.
    pub fn poll(&self, descriptor: &StageDescriptor, ctx: &PipelineContext) -> Result<PollReport, FlowError> {
        let stage = descriptor.name;
        if ctx.is_skipped(stage) {
            debug!("poll:skipped stage={stage}");
            return Ok(PollReport::synthetic(descriptor));
        }

        let mut report = PollReport::synthetic(descriptor);
        for (field, kind) in descriptor.handles {
            let arn = ctx.require_text(stage, field)?;
            if arn.trim().is_empty() {
                continue;
            }
            let desc = self.provider
                           .describe(*kind, arn)
                           .map_err(|e| FlowError::provider(stage, e))?;
            report.described += 1;

            let status = ResourceStatus::from_backend(&desc.status);
            if status == ResourceStatus::Invalid {
                warn!("poll:unknown_status stage={stage} kind={kind} raw={:?}", desc.status);
            }
            debug!("poll stage={stage} kind={kind} arn={arn} status={status}");

            match descriptor.classify(status) {
                Readiness::Failed => {
                    report.status = status;
                    report.readiness = Readiness::Failed;
                    return Ok(report);
                }
                Readiness::NotReady if report.readiness == Readiness::Ready => {
                    report.status = status;
                    report.readiness = Readiness::NotReady;
                }
                _ => {}
            }
        }
        Ok(report)
    }
}
