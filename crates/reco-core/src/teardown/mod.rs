//! Teardown Orchestrator: borrado en orden inverso de dependencias.

mod discovery;
mod engine;
mod stage;

pub use discovery::discover;
pub use engine::TeardownEngine;
pub use stage::TeardownStage;
