//! Tipos de evento de una corrida y estructura `FlowEvent`.
//!
//! El contexto es la única fuente de verdad para avanzar; los eventos sólo
//! documentan lo que el motor hizo en cada step (auditoría y tests). Cada
//! corrida se identifica por el `run_id` guardado en el contexto.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FlowError;
use crate::model::ResourceKind;
use crate::stage::ResourceStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowEventKind {
    /// Primer evento de un `run_id`: fija variante de pipeline y versión del
    /// motor.
    RunInitialized { pipeline: String, engine_version: String, stage_count: usize },
    /// Se ejecutó el ejecutor de un stage. No implica éxito.
    StageEntered { stage: String },
    /// Un recurso quedó resuelto; `created == false` si se reutilizó.
    ResourceResolved {
        stage: String,
        kind: ResourceKind,
        arn: String,
        created: bool,
    },
    /// Compuerta cerrada: el stage no produce recursos.
    StageSkipped { stage: String },
    StatusPolled { stage: String, status: ResourceStatus },
    StageFinished { stage: String, status: ResourceStatus },
    /// Fallo terminal; el pipeline no continúa.
    StageFailed { stage: String, error: FlowError },
    DeletionIssued { stage: String, kind: ResourceKind, arn: String },
    /// Un borrado individual falló y se ignoró (teardown best-effort).
    DeletionTolerated {
        stage: String,
        kind: ResourceKind,
        arn: String,
        reason: String,
    },
    FlowCompleted { skipped: Vec<String> },
}

impl FlowEventKind {
    /// Letra compacta de la variante, útil en aserciones de secuencia.
    pub fn letter(&self) -> &'static str {
        match self {
            FlowEventKind::RunInitialized { .. } => "I",
            FlowEventKind::StageEntered { .. } => "E",
            FlowEventKind::ResourceResolved { .. } => "R",
            FlowEventKind::StageSkipped { .. } => "K",
            FlowEventKind::StatusPolled { .. } => "P",
            FlowEventKind::StageFinished { .. } => "F",
            FlowEventKind::StageFailed { .. } => "X",
            FlowEventKind::DeletionIssued { .. } => "D",
            FlowEventKind::DeletionTolerated { .. } => "T",
            FlowEventKind::FlowCompleted { .. } => "C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub run_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>,
}

/// Secuencia de letras de una lista de eventos.
pub fn event_variants(events: &[FlowEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind.letter()).collect()
}
