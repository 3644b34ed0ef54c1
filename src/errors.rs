use reco_core::{FlowError, PipelineContext};
use thiserror::Error;

use crate::config::ConfigError;

/// Errores del host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de flujo: {0}")]
    Flow(#[from] FlowError),
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Se agotó `max_polls` sin llegar a un estado terminal.
    #[error("Tiempo agotado tras {polls} polls en el stage {stage}")]
    Timeout { polls: u32, stage: String, context: Box<PipelineContext> },
}

impl AppError {
    /// Último contexto conocido, si el error lo conserva.
    pub fn context(&self) -> Option<&PipelineContext> {
        match self {
            AppError::Timeout { context, .. } => Some(context),
            _ => None,
        }
    }
}
