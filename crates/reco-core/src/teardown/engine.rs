//! Teardown de paso único.
//!
//! El primer `teardown_step` descubre el inventario y lo deja en el contexto;
//! los siguientes lo leen de ahí. Por stage: los borrados se emiten al
//! entrar, y el stage queda DELETED sólo cuando volver a listar ese tipo bajo
//! el mismo padre devuelve vacío. Dentro de una llamada se sigue avanzando
//! mientras el siguiente stage ya esté vacío.
//!
//! Un borrado individual que falla se registra y se ignora: re-ejecutar el
//! teardown desde cualquier punto debe ser seguro.

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use uuid::Uuid;

use crate::constants::ENGINE_VERSION;
use crate::engine::{ensure_run_id, StepEngine};
use crate::errors::FlowError;
use crate::event::{event_variants, EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceInventory, ResourceKind};
use crate::provider::{ProviderError, ResourceProvider};
use crate::stage::{EngineSettings, ResourceStatus, SchemaPolicy};
use crate::teardown::discovery::{discover, list_or_empty};
use crate::teardown::TeardownStage;

pub struct TeardownEngine<E: EventStore = InMemoryEventStore> {
    provider: Arc<dyn ResourceProvider>,
    settings: EngineSettings,
    event_store: E,
}

impl<E: EventStore> TeardownEngine<E> {
    pub(crate) fn from_parts(provider: Arc<dyn ResourceProvider>, settings: EngineSettings, event_store: E) -> Self {
        Self { provider,
               settings,
               event_store }
    }

    pub fn events(&self, run_id: Uuid) -> Vec<FlowEvent> {
        self.event_store.list(run_id)
    }

    pub fn event_variants(&self, run_id: Uuid) -> Vec<&'static str> {
        event_variants(&self.event_store.list(run_id))
    }

    pub fn teardown_step(&mut self, mut ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        if ctx.is_completed() {
            return Err(FlowError::FlowCompleted);
        }
        let run_id = ensure_run_id(&mut ctx)?;
        match ctx.stage().map(str::to_string) {
            None => self.start(run_id, ctx),
            Some(raw) => {
                let stage = TeardownStage::parse(&raw).ok_or(FlowError::UnknownStage(raw))?;
                let inventory = ResourceInventory::read_from(&ctx)?;
                self.settle(stage, &inventory, run_id, ctx)
            }
        }
    }

    fn start(&mut self, run_id: Uuid, mut ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        let name = ctx.require_non_empty("TEARDOWN", keys::NAME)?.to_string();
        self.event_store.append_kind(run_id,
                                     FlowEventKind::RunInitialized { pipeline: "teardown".to_string(),
                                                                     engine_version: ENGINE_VERSION.to_string(),
                                                                     stage_count: TeardownStage::ORDER.len() });

        let Some(inventory) = discover(self.provider.as_ref(), &name)? else {
            ctx.set_stage_status(TeardownStage::DatasetGroup.as_str(), ResourceStatus::Deleted);
            return Ok(self.complete(run_id, ctx));
        };
        info!("teardown:start run_id={run_id} name={name} resources={}", inventory.total());
        inventory.write_into(&mut ctx);

        let first = TeardownStage::Campaign;
        self.issue_deletions(first, &inventory, run_id, &mut ctx);
        ctx.set_stage_status(first.as_str(), ResourceStatus::Deleting);
        self.settle(first, &inventory, run_id, ctx)
    }

    /// Re-lista el stage actual; si ya está vacío avanza, emitiendo los
    /// borrados del siguiente, hasta encontrar uno con recursos pendientes.
    fn settle(&mut self,
              mut stage: TeardownStage,
              inventory: &ResourceInventory,
              run_id: Uuid,
              mut ctx: PipelineContext)
              -> Result<PipelineContext, FlowError> {
        loop {
            let remaining = self.remaining(stage, inventory, &ctx)?;
            if remaining > 0 {
                debug!("teardown:waiting run_id={run_id} stage={stage} remaining={remaining}");
                ctx.set_stage_status(stage.as_str(), ResourceStatus::Deleting);
                self.event_store.append_kind(run_id,
                                             FlowEventKind::StatusPolled { stage: stage.as_str().to_string(),
                                                                           status: ResourceStatus::Deleting });
                return Ok(ctx);
            }

            info!("teardown:deleted run_id={run_id} stage={stage}");
            ctx.set_stage_status(stage.as_str(), ResourceStatus::Deleted);
            self.event_store.append_kind(run_id,
                                         FlowEventKind::StageFinished { stage: stage.as_str().to_string(),
                                                                        status: ResourceStatus::Deleted });
            match stage.next() {
                None => return Ok(self.complete(run_id, ctx)),
                Some(next) => {
                    self.issue_deletions(next, inventory, run_id, &mut ctx);
                    ctx.set_stage_status(next.as_str(), ResourceStatus::Deleting);
                    stage = next;
                }
            }
        }
    }

    fn complete(&mut self, run_id: Uuid, mut ctx: PipelineContext) -> PipelineContext {
        ctx.set(keys::COMPLETED, true);
        info!("teardown:completed run_id={run_id}");
        let retained = ctx.list(keys::RETAINED_SCHEMA_ARNS).to_vec();
        self.event_store.append_kind(run_id, FlowEventKind::FlowCompleted { skipped: retained });
        ctx
    }

    /// Borrado best-effort de todo lo del stage. Nunca falla.
    fn issue_deletions(&mut self, stage: TeardownStage, inventory: &ResourceInventory, run_id: Uuid, ctx: &mut PipelineContext) {
        if stage == TeardownStage::Schema && self.settings.schema_policy == SchemaPolicy::Retain {
            info!("teardown:schemas_retained run_id={run_id} count={}", inventory.arns(ResourceKind::Schema).len());
            return;
        }
        for kind in stage.kinds() {
            for arn in inventory.arns(*kind) {
                self.event_store.append_kind(run_id,
                                             FlowEventKind::DeletionIssued { stage: stage.as_str().to_string(),
                                                                             kind: *kind,
                                                                             arn: arn.clone() });
                match self.provider.delete(*kind, arn) {
                    Ok(()) => info!("teardown:delete run_id={run_id} kind={kind} arn={arn}"),
                    Err(ProviderError::NotFound(_)) => debug!("teardown:already_gone kind={kind} arn={arn}"),
                    Err(e) => {
                        warn!("teardown:delete_failed run_id={run_id} kind={kind} arn={arn} error={e}");
                        if *kind == ResourceKind::Schema {
                            ctx.push_to_list(keys::RETAINED_SCHEMA_ARNS, arn.as_str());
                        }
                        self.event_store.append_kind(run_id,
                                                     FlowEventKind::DeletionTolerated { stage: stage.as_str().to_string(),
                                                                                        kind: *kind,
                                                                                        arn: arn.clone(),
                                                                                        reason: e.to_string() });
                    }
                }
            }
        }
    }

    /// Recursos del stage que el backend todavía lista.
    fn remaining(&self, stage: TeardownStage, inventory: &ResourceInventory, ctx: &PipelineContext) -> Result<usize, FlowError> {
        let provider = self.provider.as_ref();
        let group = inventory.dataset_group_arn.as_str();
        let lift = |e| FlowError::provider(stage.as_str(), e);
        let count_under = |kind, parent: Option<&str>| list_or_empty(provider, kind, parent).map(|v| v.len()).map_err(lift);

        match stage {
            TeardownStage::Campaign => {
                let campaigns: usize = inventory.arns(ResourceKind::Solution)
                                                .par_iter()
                                                .map(|s| list_or_empty(provider, ResourceKind::Campaign, Some(s.as_str())).map(|v| v.len()))
                                                .collect::<Result<Vec<_>, _>>()
                                                .map_err(lift)?
                                                .into_iter()
                                                .sum();
                Ok(campaigns + count_under(ResourceKind::Recommender, Some(group))?)
            }
            TeardownStage::Solution => count_under(ResourceKind::Solution, Some(group)),
            TeardownStage::EventTracker => count_under(ResourceKind::EventTracker, Some(group)),
            TeardownStage::Dataset => count_under(ResourceKind::Dataset, Some(group)),
            TeardownStage::Schema => {
                if self.settings.schema_policy == SchemaPolicy::Retain {
                    return Ok(0);
                }
                let retained = ctx.list(keys::RETAINED_SCHEMA_ARNS);
                let mut left = 0;
                for arn in inventory.arns(ResourceKind::Schema) {
                    if retained.contains(arn) {
                        continue;
                    }
                    match provider.describe(ResourceKind::Schema, arn) {
                        Ok(_) => left += 1,
                        Err(ProviderError::NotFound(_)) => {}
                        Err(e) => return Err(lift(e)),
                    }
                }
                Ok(left)
            }
            TeardownStage::DatasetGroup => {
                let groups = list_or_empty(provider, ResourceKind::DatasetGroup, None).map_err(lift)?;
                Ok(groups.iter().filter(|g| g.arn == group).count())
            }
        }
    }
}

impl<E: EventStore> StepEngine for TeardownEngine<E> {
    fn advance(&mut self, ctx: PipelineContext) -> Result<PipelineContext, FlowError> {
        self.teardown_step(ctx)
    }
}
