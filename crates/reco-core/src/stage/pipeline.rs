//! Definiciones de pipeline: secuencia ordenada de stages con su ejecutor.
//!
//! Hay cinco variantes, todas sobre la misma tabla de descriptores:
//! - `custom`: schemas, grupo, datasets/importaciones, solution y campaign.
//! - `domain`: igual pero con grupo de dominio y cierre en RECOMMENDER.
//! - `retrain`: resuelve un grupo existente y reentrena (SOLUTION, CAMPAIGN).
//! - `usecase`: resuelve un grupo de dominio existente y crea un recommender.
//! - `batch`: jobs batch (inferencia y/o segmentos) sobre una versión ya
//!   entrenada.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stage::definition::{Stage, StageDescriptor};
use crate::stage::executor::StageExecutor;
use crate::stage::executors::{BatchJob, BatchJobExecutor, CampaignExecutor, DatasetExecutor, DatasetGroupExecutor, DatasetType, GroupMode,
                              ImportExecutor, RecommenderExecutor, SchemaExecutor, SolutionExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    #[default]
    Custom,
    Domain,
    Retrain,
    Usecase,
    Batch,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 5] = [PipelineKind::Custom,
                                        PipelineKind::Domain,
                                        PipelineKind::Retrain,
                                        PipelineKind::Usecase,
                                        PipelineKind::Batch];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Custom => "custom",
            PipelineKind::Domain => "domain",
            PipelineKind::Retrain => "retrain",
            PipelineKind::Usecase => "usecase",
            PipelineKind::Batch => "batch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Some(PipelineKind::Custom),
            "domain" => Some(PipelineKind::Domain),
            "retrain" | "train-recipe" => Some(PipelineKind::Retrain),
            "usecase" | "train-usecase" => Some(PipelineKind::Usecase),
            "batch" | "batch-inference" => Some(PipelineKind::Batch),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Un stage del pipeline con el ejecutor que lo implementa.
#[derive(Debug)]
pub struct StageBinding {
    pub descriptor: &'static StageDescriptor,
    pub executor: Box<dyn StageExecutor>,
}

impl StageBinding {
    pub fn new(stage: Stage, executor: impl StageExecutor + 'static) -> Self {
        Self { descriptor: stage.descriptor(),
               executor: Box::new(executor) }
    }

    pub fn stage(&self) -> Stage {
        self.descriptor.stage
    }
}

#[derive(Debug)]
pub struct PipelineDefinition {
    pub kind: PipelineKind,
    pub bindings: Vec<StageBinding>,
}

impl PipelineDefinition {
    pub fn for_kind(kind: PipelineKind) -> Self {
        let bindings = match kind {
            PipelineKind::Custom => {
                let mut b = data_stages(GroupMode::Create);
                b.push(StageBinding::new(Stage::Solution, SolutionExecutor));
                b.push(StageBinding::new(Stage::Campaign, CampaignExecutor));
                b
            }
            PipelineKind::Domain => {
                let mut b = data_stages(GroupMode::CreateInDomain);
                b.push(StageBinding::new(Stage::Recommender, RecommenderExecutor::named_after_group()));
                b
            }
            PipelineKind::Retrain => vec![StageBinding::new(Stage::DatasetGroup, DatasetGroupExecutor::new(GroupMode::ResolveOnly)),
                                          StageBinding::new(Stage::Solution, SolutionExecutor),
                                          StageBinding::new(Stage::Campaign, CampaignExecutor)],
            PipelineKind::Usecase => vec![StageBinding::new(Stage::DatasetGroup, DatasetGroupExecutor::new(GroupMode::ResolveDomain)),
                                          StageBinding::new(Stage::Recommender, RecommenderExecutor::per_run())],
            PipelineKind::Batch => vec![StageBinding::new(Stage::BatchInference, BatchJobExecutor::new(BatchJob::Inference)),
                                        StageBinding::new(Stage::BatchSegment, BatchJobExecutor::new(BatchJob::Segment))],
        };
        Self { kind, bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.bindings.iter().position(|b| b.stage() == stage)
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.bindings.iter().map(StageBinding::stage).collect()
    }
}

fn data_stages(group: GroupMode) -> Vec<StageBinding> {
    let mut b = vec![StageBinding::new(Stage::Schema, SchemaExecutor),
                     StageBinding::new(Stage::DatasetGroup, DatasetGroupExecutor::new(group))];
    for t in [DatasetType::Interactions, DatasetType::Items, DatasetType::Users] {
        b.push(StageBinding::new(t.dataset_stage(), DatasetExecutor::new(t)));
        b.push(StageBinding::new(t.import_stage(), ImportExecutor::new(t)));
    }
    b
}
