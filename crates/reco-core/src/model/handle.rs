//! Identidad de recursos del backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tipos de recurso que el motor crea, consulta o borra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Schema,
    DatasetGroup,
    Dataset,
    DatasetImportJob,
    EventTracker,
    Solution,
    SolutionVersion,
    Campaign,
    Recommender,
    BatchInferenceJob,
    BatchSegmentJob,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 11] = [ResourceKind::Schema,
                                         ResourceKind::DatasetGroup,
                                         ResourceKind::Dataset,
                                         ResourceKind::DatasetImportJob,
                                         ResourceKind::EventTracker,
                                         ResourceKind::Solution,
                                         ResourceKind::SolutionVersion,
                                         ResourceKind::Campaign,
                                         ResourceKind::Recommender,
                                         ResourceKind::BatchInferenceJob,
                                         ResourceKind::BatchSegmentJob];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Schema => "SCHEMA",
            ResourceKind::DatasetGroup => "DATASET_GROUP",
            ResourceKind::Dataset => "DATASET",
            ResourceKind::DatasetImportJob => "DATASET_IMPORT_JOB",
            ResourceKind::EventTracker => "EVENT_TRACKER",
            ResourceKind::Solution => "SOLUTION",
            ResourceKind::SolutionVersion => "SOLUTION_VERSION",
            ResourceKind::Campaign => "CAMPAIGN",
            ResourceKind::Recommender => "RECOMMENDER",
            ResourceKind::BatchInferenceJob => "BATCH_INFERENCE_JOB",
            ResourceKind::BatchSegmentJob => "BATCH_SEGMENT_JOB",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle opaco de un recurso: tipo + ARN + padre opcional.
///
/// `variant` distingue recursos del mismo tipo bajo el mismo padre (el tipo
/// de dataset: INTERACTIONS, ITEMS, USERS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub arn: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, arn: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind,
               arn: arn.into(),
               name: name.into(),
               parent: None,
               variant: None }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Coincidencia usada por la resolución get-or-create.
    pub fn matches(&self, name: &str, variant: Option<&str>) -> bool {
        self.name == name && (variant.is_none() || self.variant.as_deref() == variant)
    }
}
