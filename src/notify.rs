//! Frontera de notificación.
//!
//! Al terminar una corrida el runner entrega el contexto terminal a un
//! `Notifier`. El contexto de un fallo lleva el `stage` y `status` donde se
//! detuvo el pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use reco_core::{FlowError, PipelineContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub outcome: Outcome,
    pub context: PipelineContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FlowError>,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn succeeded(context: PipelineContext) -> Self {
        Self { outcome: Outcome::Succeeded,
               context,
               error: None,
               at: Utc::now() }
    }

    pub fn failed(context: PipelineContext, error: FlowError) -> Self {
        Self { outcome: Outcome::Failed,
               context,
               error: Some(error),
               at: Utc::now() }
    }

    /// Fallo del host (p. ej. polls agotados) sin error del motor.
    pub fn gave_up(context: PipelineContext) -> Self {
        Self { outcome: Outcome::Failed,
               context,
               error: None,
               at: Utc::now() }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Notifier por defecto: sólo registra el resultado.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: &Notification) {
        let name = n.context.text("name").unwrap_or_default();
        let stage = n.context.stage().unwrap_or_default();
        let status = n.context.status().map(|s| s.to_string()).unwrap_or_default();
        match (&n.outcome, &n.error) {
            (Outcome::Succeeded, _) => info!("notify:succeeded name={name} stage={stage} status={status}"),
            (Outcome::Failed, Some(e)) => error!("notify:failed name={name} stage={stage} status={status} error={e}"),
            (Outcome::Failed, None) => error!("notify:failed name={name} stage={stage} status={status}"),
        }
    }
}
