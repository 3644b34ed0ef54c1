//! Stages de creación y sus descriptores estáticos.
//!
//! Cada `Stage` tiene un único `StageDescriptor` (tabla `DESCRIPTORS`) con los
//! campos que lee y escribe, los handles que se consultan al hacer poll, la
//! compuerta que permite omitirlo y su conjunto terminal. El motor busca el
//! descriptor una vez por step; ningún call site repite `if stage == X`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceKind};
use crate::stage::status::{Readiness, ResourceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Schema,
    DatasetGroup,
    Dataset,
    DatasetImport,
    ItemDataset,
    ItemDatasetImport,
    UserDataset,
    UserDatasetImport,
    Solution,
    Campaign,
    Recommender,
    BatchInference,
    BatchSegment,
}

impl Stage {
    pub const ALL: [Stage; 13] = [Stage::Schema,
                                  Stage::DatasetGroup,
                                  Stage::Dataset,
                                  Stage::DatasetImport,
                                  Stage::ItemDataset,
                                  Stage::ItemDatasetImport,
                                  Stage::UserDataset,
                                  Stage::UserDatasetImport,
                                  Stage::Solution,
                                  Stage::Campaign,
                                  Stage::Recommender,
                                  Stage::BatchInference,
                                  Stage::BatchSegment];

    pub fn as_str(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn parse(s: &str) -> Option<Self> {
        Stage::ALL.iter().copied().find(|st| st.as_str() == s.trim())
    }

    pub fn descriptor(&self) -> &'static StageDescriptor {
        &DESCRIPTORS[*self as usize]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condición para ejecutar un stage opcional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    /// Se ejecuta sólo si el campo existe y no está vacío.
    NonEmpty(&'static str),
    /// Se ejecuta sólo si el campo es verdadero.
    Flag(&'static str),
}

impl Gate {
    pub fn is_open(&self, ctx: &PipelineContext) -> bool {
        match self {
            Gate::Always => true,
            Gate::NonEmpty(field) => ctx.non_empty(field).is_some(),
            Gate::Flag(field) => ctx.flag(field),
        }
    }
}

/// Metadatos inmutables de un stage.
#[derive(Debug)]
pub struct StageDescriptor {
    pub stage: Stage,
    pub name: &'static str,
    pub produces: &'static [ResourceKind],
    /// Campos que deben existir en el contexto antes de ejecutar.
    pub reads: &'static [&'static str],
    pub writes: &'static [&'static str],
    /// Campos con handles a consultar en el poll, con su tipo.
    pub handles: &'static [(&'static str, ResourceKind)],
    pub gate: Gate,
    pub success: ResourceStatus,
    pub failure: &'static [ResourceStatus],
}

const CREATE_FAILURES: &[ResourceStatus] = &[ResourceStatus::CreateFailed, ResourceStatus::Deleting, ResourceStatus::Deleted];

impl StageDescriptor {
    pub fn classify(&self, status: ResourceStatus) -> Readiness {
        if status == self.success {
            Readiness::Ready
        } else if self.failure.contains(&status) {
            Readiness::Failed
        } else {
            Readiness::NotReady
        }
    }

    /// Primer campo de `reads` ausente en el contexto.
    pub fn missing_read(&self, ctx: &PipelineContext) -> Option<&'static str> {
        self.reads.iter().copied().find(|f| !ctx.contains(f))
    }
}

// El orden debe coincidir con la declaración de `Stage` (se indexa por
// discriminante).
static DESCRIPTORS: [StageDescriptor; 13] = [
    StageDescriptor { stage: Stage::Schema,
                      name: "SCHEMA",
                      produces: &[ResourceKind::Schema],
                      reads: &[keys::NAME],
                      writes: &[keys::SCHEMA_ARN, keys::ITEM_SCHEMA_ARN, keys::USER_SCHEMA_ARN],
                      handles: &[(keys::SCHEMA_ARN, ResourceKind::Schema),
                                 (keys::ITEM_SCHEMA_ARN, ResourceKind::Schema),
                                 (keys::USER_SCHEMA_ARN, ResourceKind::Schema)],
                      gate: Gate::Always,
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::DatasetGroup,
                      name: "DATASET_GROUP",
                      produces: &[ResourceKind::DatasetGroup],
                      reads: &[keys::NAME],
                      writes: &[keys::DATASET_GROUP_ARN],
                      handles: &[(keys::DATASET_GROUP_ARN, ResourceKind::DatasetGroup)],
                      gate: Gate::Always,
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::Dataset,
                      name: "DATASET",
                      produces: &[ResourceKind::Dataset],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::SCHEMA_ARN],
                      writes: &[keys::DATASET_ARN],
                      handles: &[(keys::DATASET_ARN, ResourceKind::Dataset)],
                      gate: Gate::Always,
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::DatasetImport,
                      name: "DATASET_IMPORT",
                      produces: &[ResourceKind::DatasetImportJob, ResourceKind::EventTracker],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::DATASET_ARN, keys::SUFFIX],
                      writes: &[keys::DATASET_IMPORT_JOB_ARN, keys::EVENT_TRACKER_ARN],
                      handles: &[(keys::DATASET_IMPORT_JOB_ARN, ResourceKind::DatasetImportJob),
                                 (keys::EVENT_TRACKER_ARN, ResourceKind::EventTracker)],
                      gate: Gate::NonEmpty(keys::BUCKET),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::ItemDataset,
                      name: "ITEM_DATASET",
                      produces: &[ResourceKind::Dataset],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::ITEM_SCHEMA_ARN],
                      writes: &[keys::ITEM_DATASET_ARN],
                      handles: &[(keys::ITEM_DATASET_ARN, ResourceKind::Dataset)],
                      gate: Gate::NonEmpty(keys::ITEM_BUCKET),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::ItemDatasetImport,
                      name: "ITEM_DATASET_IMPORT",
                      produces: &[ResourceKind::DatasetImportJob],
                      reads: &[keys::NAME, keys::ITEM_DATASET_ARN, keys::SUFFIX],
                      writes: &[keys::ITEM_DATASET_IMPORT_JOB_ARN],
                      handles: &[(keys::ITEM_DATASET_IMPORT_JOB_ARN, ResourceKind::DatasetImportJob)],
                      gate: Gate::NonEmpty(keys::ITEM_BUCKET),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::UserDataset,
                      name: "USER_DATASET",
                      produces: &[ResourceKind::Dataset],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::USER_SCHEMA_ARN],
                      writes: &[keys::USER_DATASET_ARN],
                      handles: &[(keys::USER_DATASET_ARN, ResourceKind::Dataset)],
                      gate: Gate::NonEmpty(keys::USER_BUCKET),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::UserDatasetImport,
                      name: "USER_DATASET_IMPORT",
                      produces: &[ResourceKind::DatasetImportJob],
                      reads: &[keys::NAME, keys::USER_DATASET_ARN, keys::SUFFIX],
                      writes: &[keys::USER_DATASET_IMPORT_JOB_ARN],
                      handles: &[(keys::USER_DATASET_IMPORT_JOB_ARN, ResourceKind::DatasetImportJob)],
                      gate: Gate::NonEmpty(keys::USER_BUCKET),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::Solution,
                      name: "SOLUTION",
                      produces: &[ResourceKind::Solution, ResourceKind::SolutionVersion],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::SUFFIX],
                      writes: &[keys::SOLUTION_ARN, keys::SOLUTION_VERSION_ARN, keys::RECIPE_ARN],
                      handles: &[(keys::SOLUTION_VERSION_ARN, ResourceKind::SolutionVersion)],
                      gate: Gate::Always,
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::Campaign,
                      name: "CAMPAIGN",
                      produces: &[ResourceKind::Campaign],
                      reads: &[keys::NAME, keys::SOLUTION_ARN, keys::SOLUTION_VERSION_ARN, keys::SUFFIX],
                      writes: &[keys::CAMPAIGN_ARN, keys::CAMPAIGN_NAME],
                      handles: &[(keys::CAMPAIGN_ARN, ResourceKind::Campaign)],
                      gate: Gate::Flag(keys::DEPLOY),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::Recommender,
                      name: "RECOMMENDER",
                      produces: &[ResourceKind::Recommender],
                      reads: &[keys::NAME, keys::DATASET_GROUP_ARN, keys::RECIPE_ARN],
                      writes: &[keys::RECOMMENDER_ARN],
                      handles: &[(keys::RECOMMENDER_ARN, ResourceKind::Recommender)],
                      gate: Gate::Always,
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::BatchInference,
                      name: "BATCH_INFERENCE",
                      produces: &[ResourceKind::BatchInferenceJob],
                      reads: &[keys::NAME, keys::SOLUTION_VERSION_ARN, keys::BATCH_INPUT_PATH, keys::BATCH_OUTPUT_PATH, keys::SUFFIX],
                      writes: &[keys::BATCH_INFERENCE_JOB_ARN],
                      handles: &[(keys::BATCH_INFERENCE_JOB_ARN, ResourceKind::BatchInferenceJob)],
                      gate: Gate::Flag(keys::BATCH_INFERENCE),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
    StageDescriptor { stage: Stage::BatchSegment,
                      name: "BATCH_SEGMENT",
                      produces: &[ResourceKind::BatchSegmentJob],
                      reads: &[keys::NAME, keys::SOLUTION_VERSION_ARN, keys::SEGMENT_INPUT_PATH, keys::SEGMENT_OUTPUT_PATH, keys::SUFFIX],
                      writes: &[keys::BATCH_SEGMENT_JOB_ARN],
                      handles: &[(keys::BATCH_SEGMENT_JOB_ARN, ResourceKind::BatchSegmentJob)],
                      gate: Gate::Flag(keys::BATCH_SEGMENT),
                      success: ResourceStatus::Active,
                      failure: CREATE_FAILURES },
];
