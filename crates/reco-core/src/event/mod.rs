//! Bitácora append-only de una corrida (aprovisionamiento o teardown).

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{event_variants, FlowEvent, FlowEventKind};
