//! Pipeline Orchestrator.
//!
//! Máquina de estados lineal sobre la definición de pipeline elegida por el
//! campo `pipeline` del contexto. Transiciones de un `step`:
//! - sin `stage`: validar la petición, fijar `run_id`/`suffix` y entrar al
//!   primer stage;
//! - con `stage`: un poll; fallo terminal ⇒ `StageFailed`, no terminal ⇒ el
//!   contexto sale igual (salvo `status`), éxito ⇒ entrar al siguiente.
//!
//! Entrar a un stage con la compuerta cerrada lo marca omitido y encadena el
//! siguiente dentro de la misma llamada.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info};
use uuid::Uuid;

use crate::constants::{ENGINE_VERSION, SUFFIX_FORMAT};
use crate::engine::builder::EngineBuilder;
use crate::engine::{ensure_run_id, StepEngine};
use crate::errors::FlowError;
use crate::event::{event_variants, EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
use crate::model::context::keys;
use crate::model::PipelineContext;
use crate::poller::ReadinessPoller;
use crate::provider::{ResourceProvider, StorageAccess};
use crate::stage::{EngineSettings, PipelineDefinition, PipelineKind, Readiness, ResourceStatus, Stage, StageEnv};
use crate::validate::validate_request;

pub struct FlowEngine<E: EventStore = InMemoryEventStore> {
    provider: Arc<dyn ResourceProvider>,
    storage: Arc<dyn StorageAccess>,
    settings: EngineSettings,
    event_store: E,
    catalog: Arc<Vec<PipelineDefinition>>,
}

impl FlowEngine<InMemoryEventStore> {
    /// Builder con store de eventos en memoria.
    pub fn builder(provider: Arc<dyn ResourceProvider>) -> EngineBuilder<InMemoryEventStore> {
        EngineBuilder::new(provider)
    }
}

impl<E: EventStore> FlowEngine<E> {
    pub(crate) fn from_parts(provider: Arc<dyn ResourceProvider>,
                             storage: Arc<dyn StorageAccess>,
                             settings: EngineSettings,
                             event_store: E)
                             -> Self {
        let catalog = PipelineKind::ALL.iter()
                                       .map(|k| PipelineDefinition::for_kind(*k))
                                       .collect();
        Self { provider,
               storage,
               settings,
               event_store,
               catalog: Arc::new(catalog) }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn definition(&self, kind: PipelineKind) -> Option<&PipelineDefinition> {
        self.catalog.iter().find(|d| d.kind == kind)
    }

    pub fn events(&self, run_id: Uuid) -> Vec<FlowEvent> {
        self.event_store.list(run_id)
    }

    pub fn event_variants(&self, run_id: Uuid) -> Vec<&'static str> {
        event_variants(&self.event_store.list(run_id))
    }

    /// Avanza el pipeline un paso no bloqueante.
    pub fn step(&mut self, mut ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        if ctx.is_completed() {
            return Err(FlowError::FlowCompleted);
        }
        let kind = match ctx.non_empty(keys::PIPELINE) {
            None => PipelineKind::default(),
            Some(raw) => PipelineKind::parse(raw).ok_or_else(|| FlowError::Validation(format!("unknown pipeline `{raw}`")))?,
        };
        let catalog = Arc::clone(&self.catalog);
        let definition = catalog.iter()
                                .find(|d| d.kind == kind)
                                .ok_or_else(|| FlowError::Validation(format!("pipeline `{kind}` is not registered")))?;

        match ctx.stage().map(str::to_string) {
            None => self.start(definition, ctx),
            Some(stage) => {
                let run_id = ensure_run_id(&mut ctx)?;
                self.poll_stage(definition, &stage, run_id, ctx)
            }
        }
    }

    fn start(&mut self, definition: &PipelineDefinition, mut ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        validate_request(definition.kind, &ctx)?;
        let run_id = ensure_run_id(&mut ctx)?;
        if ctx.non_empty(keys::SUFFIX).is_none() {
            ctx.set(keys::SUFFIX, Utc::now().format(SUFFIX_FORMAT).to_string());
        }
        ctx.set(keys::PIPELINE, definition.kind.as_str());

        info!("run:start run_id={run_id} pipeline={} stages={}", definition.kind, definition.len());
        self.event_store
            .append_kind(run_id,
                         FlowEventKind::RunInitialized { pipeline: definition.kind.as_str().to_string(),
                                                         engine_version: ENGINE_VERSION.to_string(),
                                                         stage_count: definition.len() });
        self.enter(definition, 0, run_id, ctx)
    }

    fn poll_stage(&mut self,
                  definition: &PipelineDefinition,
                  stage_name: &str,
                  run_id: Uuid,
                  mut ctx: PipelineContext)
                  -> Result<PipelineContext, FlowError> {
        let stage = Stage::parse(stage_name).ok_or_else(|| FlowError::UnknownStage(stage_name.to_string()))?;
        let index = definition.position(stage)
                              .ok_or_else(|| FlowError::UnknownStage(format!("{stage_name} is not part of the {} pipeline", definition.kind)))?;
        let descriptor = definition.bindings[index].descriptor;

        let report = ReadinessPoller::new(self.provider.as_ref()).poll(descriptor, &ctx)?;
        ctx.set_status(report.status);
        if report.described > 0 {
            self.event_store.append_kind(run_id,
                                         FlowEventKind::StatusPolled { stage: stage_name.to_string(),
                                                                       status: report.status });
        }

        match report.readiness {
            Readiness::Failed => {
                let err = FlowError::StageFailed { stage: stage_name.to_string(),
                                                   status: report.status.to_string() };
                error!("stage:failed run_id={run_id} stage={stage_name} status={}", report.status);
                self.event_store.append_kind(run_id,
                                             FlowEventKind::StageFailed { stage: stage_name.to_string(),
                                                                          error: err.clone() });
                Err(err)
            }
            Readiness::NotReady => {
                debug!("stage:not_ready run_id={run_id} stage={stage_name} status={}", report.status);
                Ok(ctx)
            }
            Readiness::Ready => {
                info!("stage:finished run_id={run_id} stage={stage_name} status={}", report.status);
                self.event_store.append_kind(run_id,
                                             FlowEventKind::StageFinished { stage: stage_name.to_string(),
                                                                            status: report.status });
                self.enter(definition, index + 1, run_id, ctx)
            }
        }
    }

    /// Entra al stage `index`, saltando los de compuerta cerrada. Devuelve el
    /// contexto en PENDING del primer stage ejecutado, o el contexto final si
    /// no quedan stages.
    fn enter(&mut self,
             definition: &PipelineDefinition,
             index: usize,
             run_id: Uuid,
             mut ctx: PipelineContext)
             -> Result<PipelineContext, FlowError> {
        for binding in &definition.bindings[index.min(definition.len())..] {
            let d = binding.descriptor;

            if !d.gate.is_open(&ctx) {
                info!("stage:skip run_id={run_id} stage={}", d.name);
                let handle_fields = d.handles.iter().map(|(f, _)| f);
                for field in d.writes.iter().chain(handle_fields) {
                    if !ctx.contains(field) {
                        ctx.set(field, "");
                    }
                }
                ctx.push_to_list(keys::SKIPPED_STAGES, d.name);
                ctx.set_stage_status(d.name, d.success);
                self.event_store
                    .append_kind(run_id, FlowEventKind::StageSkipped { stage: d.name.to_string() });
                continue;
            }

            if let Some(field) = d.missing_read(&ctx) {
                error!("stage:wiring run_id={run_id} stage={} missing={field}", d.name);
                return Err(FlowError::missing(d.name, field));
            }

            info!("stage:enter run_id={run_id} stage={}", d.name);
            self.event_store
                .append_kind(run_id, FlowEventKind::StageEntered { stage: d.name.to_string() });

            let result = {
                let env = StageEnv { provider: self.provider.as_ref(),
                                     storage: self.storage.as_ref(),
                                     settings: &self.settings };
                binding.executor.execute(ctx, &env)
            };
            let output = match result {
                Ok(output) => output,
                Err(err) => {
                    error!("stage:error run_id={run_id} stage={} error={err}", d.name);
                    self.event_store.append_kind(run_id,
                                                 FlowEventKind::StageFailed { stage: d.name.to_string(),
                                                                              error: err.clone() });
                    return Err(err);
                }
            };

            for r in &output.resources {
                self.event_store.append_kind(run_id,
                                             FlowEventKind::ResourceResolved { stage: d.name.to_string(),
                                                                               kind: r.kind,
                                                                               arn: r.arn.clone(),
                                                                               created: r.created });
            }
            let mut next = output.context;
            next.set_stage_status(d.name, ResourceStatus::Pending);
            return Ok(next);
        }

        ctx.set(keys::COMPLETED, true);
        let skipped = ctx.list(keys::SKIPPED_STAGES).to_vec();
        info!("run:completed run_id={run_id} skipped={}", skipped.len());
        self.event_store.append_kind(run_id, FlowEventKind::FlowCompleted { skipped });
        Ok(ctx)
    }
}

impl<E: EventStore> StepEngine for FlowEngine<E> {
    fn advance(&mut self, ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        self.step(ctx)
    }
}
