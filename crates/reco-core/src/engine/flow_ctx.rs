//! Contexto de ejecución ligado a un motor.

use crate::engine::StepEngine;
use crate::errors::FlowError;
use crate::model::PipelineContext;

/// API ergonómica para encadenar steps sobre un contexto sin esperas entre
/// ellos (tests, backends que responden al instante). El host con
/// temporizador vive en `recoflow::runner`.
pub struct FlowCtx<'a, S: StepEngine> {
    pub engine: &'a mut S,
    pub context: PipelineContext,
}

impl<'a, S: StepEngine> FlowCtx<'a, S> {
    #[inline]
    pub fn new(engine: &'a mut S, context: PipelineContext) -> Self {
        Self { engine, context }
    }

    /// Un step. El contexto sólo se reemplaza si el step tuvo éxito.
    #[inline]
    pub fn step(&mut self) -> Result<(), FlowError> {
        let next = self.engine.advance(self.context.clone())?;
        self.context = next;
        Ok(())
    }

    /// Ejecuta steps hasta que el contexto quede completo o haya un error
    /// terminal.
    #[inline]
    pub fn run_to_completion(&mut self) -> Result<&PipelineContext, FlowError> {
        while !self.context.is_completed() {
            self.step()?;
        }
        Ok(&self.context)
    }

    pub fn into_context(self) -> PipelineContext {
        self.context
    }
}
