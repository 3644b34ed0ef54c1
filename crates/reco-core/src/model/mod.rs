//! Modelo de datos del motor: contexto, handles, inventario y ubicaciones.

pub mod context;
pub mod handle;
pub mod inventory;
pub mod location;

pub use context::{keys, FieldValue, PipelineContext};
pub use handle::{ResourceHandle, ResourceKind};
pub use inventory::ResourceInventory;
pub use location::DataLocation;
