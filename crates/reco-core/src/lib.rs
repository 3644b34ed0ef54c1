//! reco-core: motor de aprovisionamiento/teardown por pasos.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod model;
pub mod poller;
pub mod provider;
pub mod stage;
pub mod teardown;
pub mod validate;

pub use engine::{EngineBuilder, FlowCtx, FlowEngine, StepEngine};
pub use errors::FlowError;
pub use event::{event_variants, EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use model::{keys, DataLocation, FieldValue, PipelineContext, ResourceHandle, ResourceInventory, ResourceKind};
pub use poller::{PollReport, ReadinessPoller};
pub use provider::{ProviderError, ResourceDescription, ResourceProvider, ResourceSpec, StorageAccess};
pub use stage::{EngineSettings, PipelineKind, Readiness, ResourceStatus, SchemaPolicy, Stage};
pub use teardown::{TeardownEngine, TeardownStage};
