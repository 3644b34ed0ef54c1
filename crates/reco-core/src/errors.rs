//! Errores del core.
//!
//! Taxonomía de fallos del motor de aprovisionamiento. `NotReady` no aparece
//! aquí: un estado no terminal no es un error, sólo provoca otro poll.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum FlowError {
    /// Entrada externa malformada. Se detecta antes de cualquier llamada al
    /// backend y nunca se reintenta.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Falta un campo requerido en el contexto: error de cableado del
    /// pipeline, no se reintenta.
    #[error("stage {stage}: missing required field `{field}`")]
    MissingField { stage: String, field: String },
    /// El backend rechazó una llamada.
    #[error("stage {stage}: provider error: {message}")]
    Provider { stage: String, message: String },
    /// El estado terminal del stage es su valor de fallo.
    #[error("stage {stage} failed with status {status}")]
    StageFailed { stage: String, status: String },
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("flow already completed")]
    FlowCompleted,
}

impl FlowError {
    pub(crate) fn provider(stage: &str, err: ProviderError) -> Self {
        FlowError::Provider { stage: stage.to_string(),
                              message: err.to_string() }
    }

    pub(crate) fn missing(stage: &str, field: &str) -> Self {
        FlowError::MissingField { stage: stage.to_string(),
                                  field: field.to_string() }
    }

    /// Stage en el que se originó el error, si aplica.
    pub fn stage(&self) -> Option<&str> {
        match self {
            FlowError::MissingField { stage, .. } | FlowError::Provider { stage, .. } | FlowError::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failed_message_names_stage_and_status() {
        let err = FlowError::StageFailed { stage: "SOLUTION".into(),
                                           status: "CREATE_FAILED".into() };
        assert_eq!(err.to_string(), "stage SOLUTION failed with status CREATE_FAILED");
        assert_eq!(err.stage(), Some("SOLUTION"));
    }

    #[test]
    fn provider_error_is_lifted_with_stage() {
        let err = FlowError::provider("DATASET", ProviderError::Rejected("quota".into()));
        assert_eq!(err.stage(), Some("DATASET"));
        assert!(err.to_string().contains("quota"));
        assert_eq!(FlowError::Validation("x".into()).stage(), None);
    }
}
