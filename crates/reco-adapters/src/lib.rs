//! reco-adapters: colaboradores concretos del motor.
//!
//! - `SimulatedProvider`: backend en proceso con estados eventualmente
//!   consistentes y un journal de llamadas (tests, CLI).
//! - `SimulatedStorage`: registra las políticas de bucket concedidas.
//! - `bucket_read_policy` / `bucket_read_write_policy`: documentos de
//!   política que conceden acceso al servicio sobre un bucket.

pub mod policy;
pub mod simulated;
pub mod storage;

pub use policy::{bucket_read_policy, bucket_read_write_policy};
pub use simulated::{CallOp, Phase, ProviderCall, SimulatedProvider, SimulatedResource, SimulatedState};
pub use storage::SimulatedStorage;
