use log::info;

use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{DataLocation, PipelineContext, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{resolve_or_create, StageEnv, StageExecutor, StageOutput};
use crate::stage::Stage;

/// Tipo de dataset y los campos de contexto de su rama.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetType {
    Interactions,
    Items,
    Users,
}

impl DatasetType {
    pub fn variant(&self) -> &'static str {
        match self {
            DatasetType::Interactions => "INTERACTIONS",
            DatasetType::Items => "ITEMS",
            DatasetType::Users => "USERS",
        }
    }

    pub fn dataset_stage(&self) -> Stage {
        match self {
            DatasetType::Interactions => Stage::Dataset,
            DatasetType::Items => Stage::ItemDataset,
            DatasetType::Users => Stage::UserDataset,
        }
    }

    pub fn import_stage(&self) -> Stage {
        match self {
            DatasetType::Interactions => Stage::DatasetImport,
            DatasetType::Items => Stage::ItemDatasetImport,
            DatasetType::Users => Stage::UserDatasetImport,
        }
    }

    pub fn schema_field(&self) -> &'static str {
        match self {
            DatasetType::Interactions => keys::SCHEMA_ARN,
            DatasetType::Items => keys::ITEM_SCHEMA_ARN,
            DatasetType::Users => keys::USER_SCHEMA_ARN,
        }
    }

    pub fn bucket_field(&self) -> &'static str {
        match self {
            DatasetType::Interactions => keys::BUCKET,
            DatasetType::Items => keys::ITEM_BUCKET,
            DatasetType::Users => keys::USER_BUCKET,
        }
    }

    pub fn dataset_field(&self) -> &'static str {
        match self {
            DatasetType::Interactions => keys::DATASET_ARN,
            DatasetType::Items => keys::ITEM_DATASET_ARN,
            DatasetType::Users => keys::USER_DATASET_ARN,
        }
    }

    pub fn job_field(&self) -> &'static str {
        match self {
            DatasetType::Interactions => keys::DATASET_IMPORT_JOB_ARN,
            DatasetType::Items => keys::ITEM_DATASET_IMPORT_JOB_ARN,
            DatasetType::Users => keys::USER_DATASET_IMPORT_JOB_ARN,
        }
    }

    pub fn dataset_name(&self, name: &str) -> String {
        match self {
            DatasetType::Interactions => name.to_string(),
            DatasetType::Items => format!("{name}-items"),
            DatasetType::Users => format!("{name}-users"),
        }
    }

    pub fn job_name(&self, name: &str, suffix: &str) -> String {
        match self {
            DatasetType::Interactions => format!("{name}-{suffix}"),
            DatasetType::Items => format!("{name}-item-{suffix}"),
            DatasetType::Users => format!("{name}-user-{suffix}"),
        }
    }
}

/// Get-or-create del dataset de una rama. Al crearlo por primera vez concede
/// al backend lectura sobre la ubicación de datos; al reutilizarlo no.
#[derive(Debug)]
pub struct DatasetExecutor {
    pub dataset_type: DatasetType,
}

impl DatasetExecutor {
    pub fn new(dataset_type: DatasetType) -> Self {
        Self { dataset_type }
    }
}

impl StageExecutor for DatasetExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let kind = self.dataset_type;
        let stage = kind.dataset_stage().as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?;
        let group = ctx.require_non_empty(stage, keys::DATASET_GROUP_ARN)?;
        let schema = ctx.require_non_empty(stage, kind.schema_field())?;
        let location = ctx.non_empty(kind.bucket_field()).map(DataLocation::parse).transpose()?;

        let spec = ResourceSpec::new(kind.dataset_name(name)).with_variant(kind.variant())
                                                             .with_attr(attrs::SCHEMA_ARN, schema);
        let (handle, created) = resolve_or_create(env, stage, ResourceKind::Dataset, Some(group), &spec)?;

        if created {
            if let Some(loc) = &location {
                env.storage
                   .grant_read_access(loc)
                   .map_err(|e| FlowError::provider(stage, e))?;
                info!("{stage}: granted read access bucket={}", loc.bucket);
            }
        }

        ctx.set(kind.dataset_field(), handle.arn.as_str());
        Ok(StageOutput::new(ctx).resolved(&handle, created))
    }
}
