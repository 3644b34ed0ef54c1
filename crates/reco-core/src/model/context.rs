//! Contexto del pipeline.
//!
//! Un `PipelineContext` es un mapa plano campo → valor primitivo que viaja
//! entre steps. El host lo serializa entre invocaciones (JSON), por lo que
//! sólo admite tipos simples: texto, números, booleanos y listas de strings.
//! `Document` queda reservado para payloads opacos que el backend recibe tal
//! cual (definición de schema, `solution_config`, `campaign_config`).
//!
//! El orden de inserción se conserva (`IndexMap`) para que el JSON resultante
//! sea estable entre steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::FlowError;
use crate::stage::ResourceStatus;

/// Nombres de campo con significado para el motor.
pub mod keys {
    pub const NAME: &str = "name";
    pub const STAGE: &str = "stage";
    pub const STATUS: &str = "status";
    pub const PIPELINE: &str = "pipeline";
    pub const RUN_ID: &str = "run_id";
    pub const SUFFIX: &str = "suffix";
    pub const COMPLETED: &str = "completed";
    pub const SKIPPED_STAGES: &str = "skipped_stages";

    pub const SCHEMA: &str = "schema";
    pub const SCHEMA_ARN: &str = "schema_arn";
    pub const ITEM_SCHEMA: &str = "item_schema";
    pub const ITEM_SCHEMA_ARN: &str = "item_schema_arn";
    pub const USER_SCHEMA: &str = "user_schema";
    pub const USER_SCHEMA_ARN: &str = "user_schema_arn";

    pub const DOMAIN: &str = "domain";
    pub const DATASET_GROUP_ARN: &str = "dataset_group_arn";

    pub const BUCKET: &str = "bucket";
    pub const ITEM_BUCKET: &str = "item_bucket";
    pub const USER_BUCKET: &str = "user_bucket";
    pub const DATASET_ARN: &str = "dataset_arn";
    pub const ITEM_DATASET_ARN: &str = "item_dataset_arn";
    pub const USER_DATASET_ARN: &str = "user_dataset_arn";
    pub const DATASET_IMPORT_JOB_ARN: &str = "dataset_import_job_arn";
    pub const ITEM_DATASET_IMPORT_JOB_ARN: &str = "item_dataset_import_job_arn";
    pub const USER_DATASET_IMPORT_JOB_ARN: &str = "user_dataset_import_job_arn";
    pub const EVENT_TRACKER_ARN: &str = "event_tracker_arn";

    pub const RECIPE_ARN: &str = "recipe_arn";
    pub const PERFORM_HPO: &str = "perform_hpo";
    pub const EVENT_TYPE: &str = "event_type";
    pub const SOLUTION_CONFIG: &str = "solution_config";
    pub const TRAINING_MODE: &str = "training_mode";
    pub const SOLUTION_ARN: &str = "solution_arn";
    pub const SOLUTION_VERSION_ARN: &str = "solution_version_arn";

    pub const DEPLOY: &str = "deploy";
    pub const MIN_PROVISIONED_TPS: &str = "min_provisioned_tps";
    pub const CAMPAIGN_CONFIG: &str = "campaign_config";
    pub const CAMPAIGN_ARN: &str = "campaign_arn";
    pub const CAMPAIGN_NAME: &str = "campaign_name";
    pub const RECOMMENDER_CONFIG: &str = "recommender_config";
    pub const RECOMMENDER_ARN: &str = "recommender_arn";

    pub const BATCH_INFERENCE: &str = "batch_inference";
    pub const BATCH_INPUT_PATH: &str = "batch_input_path";
    pub const BATCH_OUTPUT_PATH: &str = "batch_output_path";
    pub const BATCH_INFERENCE_JOB_CONFIG: &str = "batch_inference_job_config";
    pub const BATCH_INFERENCE_JOB_ARN: &str = "batch_inference_job_arn";
    pub const BATCH_SEGMENT: &str = "batch_segment";
    pub const SEGMENT_INPUT_PATH: &str = "segment_input_path";
    pub const SEGMENT_OUTPUT_PATH: &str = "segment_output_path";
    pub const BATCH_SEGMENT_JOB_ARN: &str = "batch_segment_job_arn";
    pub const NUM_RESULTS: &str = "num_results";

    pub const CAMPAIGN_ARNS: &str = "campaign_arns";
    pub const RECOMMENDER_ARNS: &str = "recommender_arns";
    pub const SOLUTION_ARNS: &str = "solution_arns";
    pub const EVENT_TRACKER_ARNS: &str = "event_tracker_arns";
    pub const DATASET_ARNS: &str = "dataset_arns";
    pub const SCHEMA_ARNS: &str = "schema_arns";
    pub const RETAINED_SCHEMA_ARNS: &str = "retained_schema_arns";
}

/// Valor primitivo de un campo del contexto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<String>),
    Document(Map<String, Value>),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Number(Number::from(v))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

impl From<Map<String, Value>> for FieldValue {
    fn from(v: Map<String, Value>) -> Self {
        FieldValue::Document(v)
    }
}

/// Bolsa de campos que se reemplaza (no se muta en sitio) en cada step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineContext {
    fields: IndexMap<String, FieldValue>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variante encadenable de `set`, cómoda para construir peticiones.
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Texto del campo; `None` si falta o no es texto.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Texto no vacío. Un string vacío marca un recurso omitido y nunca debe
    /// confundirse con un handle real.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.text(key).filter(|s| !s.trim().is_empty())
    }

    /// Campo de texto requerido por `stage`. Falta → `MissingField`; presente
    /// con otro tipo → `Validation`.
    pub fn require_text(&self, stage: &str, key: &str) -> Result<&str, FlowError> {
        match self.fields.get(key) {
            None => Err(FlowError::missing(stage, key)),
            Some(FieldValue::Text(s)) => Ok(s.as_str()),
            Some(other) => Err(FlowError::Validation(format!("field `{key}` must be a string, got {other:?}"))),
        }
    }

    /// Igual que `require_text` pero además exige contenido.
    pub fn require_non_empty(&self, stage: &str, key: &str) -> Result<&str, FlowError> {
        let v = self.require_text(stage, key)?;
        if v.trim().is_empty() {
            return Err(FlowError::missing(stage, key));
        }
        Ok(v)
    }

    /// Booleano tolerante: acepta `true` y los textos "true"/"1"/"yes".
    pub fn flag(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(FieldValue::Bool(b)) => *b,
            Some(FieldValue::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            Some(FieldValue::Number(n)) => n.as_u64().map(|v| v != 0).unwrap_or(false),
            _ => false,
        }
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        match self.fields.get(key) {
            Some(FieldValue::Number(n)) => n.as_u64(),
            Some(FieldValue::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Lista de strings; vacía si el campo falta.
    pub fn list(&self, key: &str) -> &[String] {
        match self.fields.get(key) {
            Some(FieldValue::List(v)) => v.as_slice(),
            _ => &[],
        }
    }

    pub fn push_to_list(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.get_mut(key) {
            Some(FieldValue::List(v)) => {
                if !v.contains(&value) {
                    v.push(value);
                }
            }
            _ => {
                self.fields.insert(key.to_string(), FieldValue::List(vec![value]));
            }
        }
    }

    pub fn document(&self, key: &str) -> Option<&Map<String, Value>> {
        match self.fields.get(key) {
            Some(FieldValue::Document(m)) => Some(m),
            _ => None,
        }
    }

    /// Documento como JSON listo para el backend. Acepta también un texto con
    /// JSON embebido (forma en que algunos hosts lo transportan).
    pub fn document_value(&self, key: &str) -> Result<Option<Value>, FlowError> {
        match self.fields.get(key) {
            Some(FieldValue::Document(m)) if m.is_empty() => Ok(None),
            Some(FieldValue::Document(m)) => Ok(Some(Value::Object(m.clone()))),
            Some(FieldValue::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(FieldValue::Text(s)) => serde_json::from_str(s).map(Some)
                                                                  .map_err(|e| FlowError::Validation(format!("field `{key}` is not valid JSON: {e}"))),
            None => Ok(None),
            Some(other) => Err(FlowError::Validation(format!("field `{key}` must be a document, got {other:?}"))),
        }
    }

    pub fn stage(&self) -> Option<&str> {
        self.non_empty(keys::STAGE)
    }

    /// Estado registrado en el último step. El motor lo recalcula al inicio
    /// de cada poll, así que sólo sirve como informe.
    pub fn status(&self) -> Option<ResourceStatus> {
        self.text(keys::STATUS).and_then(ResourceStatus::parse)
    }

    pub fn set_stage_status(&mut self, stage: &str, status: ResourceStatus) {
        self.set(keys::STAGE, stage);
        self.set(keys::STATUS, status.as_str());
    }

    pub fn set_status(&mut self, status: ResourceStatus) {
        self.set(keys::STATUS, status.as_str());
    }

    pub fn is_completed(&self) -> bool {
        self.flag(keys::COMPLETED)
    }

    pub fn is_skipped(&self, stage: &str) -> bool {
        self.list(keys::SKIPPED_STAGES).iter().any(|s| s == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_flat_request_with_document() {
        let ctx: PipelineContext = serde_json::from_value(json!({
            "name": "demo",
            "bucket": "s3://b/x.csv",
            "deploy": true,
            "min_provisioned_tps": 2,
            "schema": {"type": "record", "name": "Interactions"},
            "skipped_stages": ["ITEM_DATASET"]
        })).expect("context should parse");

        assert_eq!(ctx.text("name"), Some("demo"));
        assert!(ctx.flag("deploy"));
        assert_eq!(ctx.number("min_provisioned_tps"), Some(2));
        assert!(ctx.document("schema").is_some());
        assert!(ctx.is_skipped("ITEM_DATASET"));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let ctx = PipelineContext::new().with("name", "demo")
                                        .with("stage", "DATASET")
                                        .with("status", "PENDING");
        let s = serde_json::to_string(&ctx).expect("serialize");
        assert_eq!(s, r#"{"name":"demo","stage":"DATASET","status":"PENDING"}"#);
    }

    #[test]
    fn require_text_distinguishes_missing_and_wrong_type() {
        let ctx = PipelineContext::new().with("deploy", true);
        assert_eq!(ctx.require_text("DATASET", "dataset_group_arn"),
                   Err(FlowError::MissingField { stage: "DATASET".into(),
                                                 field: "dataset_group_arn".into() }));
        assert!(matches!(ctx.require_text("CAMPAIGN", "deploy"), Err(FlowError::Validation(_))));
    }

    #[test]
    fn empty_text_is_not_a_handle() {
        let ctx = PipelineContext::new().with("campaign_arn", "");
        assert!(ctx.contains("campaign_arn"));
        assert_eq!(ctx.non_empty("campaign_arn"), None);
    }

    #[test]
    fn document_value_accepts_embedded_json_text() {
        let ctx = PipelineContext::new().with("solution_config", r#"{"eventValueThreshold":"0.5"}"#)
                                        .with("campaign_config", "not json");
        assert_eq!(ctx.document_value("solution_config").unwrap(), Some(json!({"eventValueThreshold": "0.5"})));
        assert!(ctx.document_value("campaign_config").is_err());
        assert_eq!(ctx.document_value("missing").unwrap(), None);
    }

    #[test]
    fn push_to_list_deduplicates() {
        let mut ctx = PipelineContext::new();
        ctx.push_to_list("skipped_stages", "CAMPAIGN");
        ctx.push_to_list("skipped_stages", "CAMPAIGN");
        assert_eq!(ctx.list("skipped_stages"), ["CAMPAIGN".to_string()]);
    }
}
