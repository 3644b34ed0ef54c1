//! Stages de aprovisionamiento: estados, descriptores, ejecutores y
//! definiciones de pipeline.

pub mod definition;
pub mod executor;
pub mod executors;
pub mod pipeline;
pub mod status;

pub use definition::{Gate, Stage, StageDescriptor};
pub use executor::{resolve_or_create, EngineSettings, ResolvedResource, SchemaPolicy, StageEnv, StageExecutor, StageOutput};
pub use pipeline::{PipelineDefinition, PipelineKind, StageBinding};
pub use status::{Readiness, ResourceStatus};
