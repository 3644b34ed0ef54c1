use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{find_existing, resolve_or_create, StageEnv, StageExecutor, StageOutput};
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// Get-or-create de un grupo personalizado.
    Create,
    /// Get-or-create con `domain` (pipelines de casos de uso).
    CreateInDomain,
    /// Sólo resolver por nombre; un grupo inexistente es un error de entrada.
    ResolveOnly,
    /// Como `ResolveOnly`, pero el grupo debe ser de dominio. Su `domain`
    /// pasa al contexto.
    ResolveDomain,
}

#[derive(Debug)]
pub struct DatasetGroupExecutor {
    pub mode: GroupMode,
}

impl DatasetGroupExecutor {
    pub fn new(mode: GroupMode) -> Self {
        Self { mode }
    }
}

impl StageExecutor for DatasetGroupExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let stage = Stage::DatasetGroup.as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?.to_string();

        let (handle, created) = match self.mode {
            GroupMode::ResolveOnly => {
                let found = find_existing(env, stage, ResourceKind::DatasetGroup, None, &name, None)?;
                let handle = found.ok_or_else(|| FlowError::Validation(format!("there is no dataset group named `{name}`")))?;
                (handle, false)
            }
            GroupMode::ResolveDomain => {
                let found = find_existing(env, stage, ResourceKind::DatasetGroup, None, &name, None)?;
                let handle = found.ok_or_else(|| FlowError::Validation(format!("there is no dataset group named `{name}`")))?;
                let desc = env.provider
                              .describe(ResourceKind::DatasetGroup, &handle.arn)
                              .map_err(|e| FlowError::provider(stage, e))?;
                let domain = desc.attr_str(attrs::DOMAIN)
                                 .filter(|d| !d.is_empty())
                                 .ok_or_else(|| FlowError::Validation(format!("dataset group `{name}` has no domain")))?;
                ctx.set(keys::DOMAIN, domain);
                (handle, false)
            }
            GroupMode::Create => resolve_or_create(env, stage, ResourceKind::DatasetGroup, None, &ResourceSpec::new(&name))?,
            GroupMode::CreateInDomain => {
                let domain = ctx.require_non_empty(stage, keys::DOMAIN)?;
                let spec = ResourceSpec::new(&name).with_attr(attrs::DOMAIN, domain);
                resolve_or_create(env, stage, ResourceKind::DatasetGroup, None, &spec)?
            }
        };

        ctx.set(keys::DATASET_GROUP_ARN, handle.arn.as_str());
        Ok(StageOutput::new(ctx).resolved(&handle, created))
    }
}
