//! Contrato del Resource Provider.
//!
//! El motor no conoce el backend concreto: sólo depende de estas cuatro
//! operaciones por tipo de recurso. Las implementaciones se inyectan por
//! constructor (`Arc<dyn ResourceProvider>`); no hay clientes globales.
//!
//! Reglas que el motor asume del backend:
//! - Los nombres son únicos por tipo y padre (base de la resolución
//!   get-or-create).
//! - `describe` devuelve un vocabulario de estados estable por tipo
//!   (`ACTIVE`, `CREATE PENDING`, `CREATE FAILED`, ...).
//! - `list` bajo un padre ya borrado puede responder `NotFound`; el motor lo
//!   trata como lista vacía durante el teardown.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{DataLocation, ResourceHandle, ResourceKind};

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Parámetros de creación: nombre, variante y atributos propios del tipo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               ..Self::default() }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Resultado de `describe`: handle, estado crudo del backend y atributos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub handle: ResourceHandle,
    pub status: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceDescription {
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Capacidad create / describe / list / delete por tipo de recurso.
pub trait ResourceProvider: Send + Sync {
    fn create(&self, kind: ResourceKind, parent: Option<&str>, spec: &ResourceSpec) -> Result<ResourceHandle, ProviderError>;

    fn describe(&self, kind: ResourceKind, arn: &str) -> Result<ResourceDescription, ProviderError>;

    fn list(&self, kind: ResourceKind, parent: Option<&str>) -> Result<Vec<ResourceHandle>, ProviderError>;

    fn delete(&self, kind: ResourceKind, arn: &str) -> Result<(), ProviderError>;
}

/// Acción auxiliar de arranque: conceder al backend acceso sobre la
/// ubicación de datos. Ambas operaciones deben ser idempotentes.
pub trait StorageAccess: Send + Sync {
    fn grant_read_access(&self, location: &DataLocation) -> Result<(), ProviderError>;

    /// Lectura y escritura: destinos de los jobs batch.
    fn grant_read_write_access(&self, location: &DataLocation) -> Result<(), ProviderError>;
}

/// Atributos reconocidos en `ResourceSpec` / `ResourceDescription`.
pub mod attrs {
    pub const SCHEMA: &str = "schema";
    pub const DOMAIN: &str = "domain";
    pub const SCHEMA_ARN: &str = "schema_arn";
    pub const DATA_LOCATION: &str = "data_location";
    pub const ROLE_ARN: &str = "role_arn";
    pub const RECIPE_ARN: &str = "recipe_arn";
    pub const PERFORM_HPO: &str = "perform_hpo";
    pub const EVENT_TYPE: &str = "event_type";
    pub const SOLUTION_CONFIG: &str = "solution_config";
    pub const TRAINING_MODE: &str = "training_mode";
    pub const SOLUTION_VERSION_ARN: &str = "solution_version_arn";
    pub const MIN_PROVISIONED_TPS: &str = "min_provisioned_tps";
    pub const CAMPAIGN_CONFIG: &str = "campaign_config";
    pub const RECOMMENDER_CONFIG: &str = "recommender_config";
    pub const JOB_INPUT: &str = "job_input";
    pub const JOB_OUTPUT: &str = "job_output";
    pub const NUM_RESULTS: &str = "num_results";
    pub const BATCH_INFERENCE_JOB_CONFIG: &str = "batch_inference_job_config";
}
