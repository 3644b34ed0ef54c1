//! Motores de paso único: aprovisionamiento (`FlowEngine`) y su builder.
//!
//! Ninguno duerme ni reintenta: cada llamada avanza el contexto lo que se
//! pueda sin bloquear y devuelve el sucesor. El host decide cuándo volver a
//! llamar.

pub mod builder;
pub mod core;
pub mod flow_ctx;

pub use self::builder::EngineBuilder;
pub use self::core::FlowEngine;
pub use self::flow_ctx::FlowCtx;

use uuid::Uuid;

use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::PipelineContext;

/// Avance de un paso sobre un contexto. Lo implementan ambos motores para que
/// el host pueda manejarlos con el mismo bucle.
pub trait StepEngine {
    fn advance(&mut self, ctx: PipelineContext) -> Result<PipelineContext, FlowError>;
}

/// `run_id` del contexto; se asigna uno nuevo si falta.
pub(crate) fn ensure_run_id(ctx: &mut PipelineContext) -> Result<Uuid, FlowError> {
    match ctx.non_empty(keys::RUN_ID) {
        Some(raw) => Uuid::parse_str(raw).map_err(|e| FlowError::Validation(format!("run_id `{raw}` is not a UUID: {e}"))),
        None => {
            let id = Uuid::new_v4();
            ctx.set(keys::RUN_ID, id.to_string());
            Ok(id)
        }
    }
}
