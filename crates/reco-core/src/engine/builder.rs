//! Builder para `FlowEngine` y `TeardownEngine`.
//!
//! El provider es obligatorio (se inyecta por constructor, sin clientes
//! globales). El resto tiene valores por defecto: sin acceso a storage, sin
//! role ARN, política de schemas `Retain` y store de eventos en memoria.
//!
//! ```ignore
//! let mut engine = FlowEngine::builder(provider)
//!     .storage(storage)
//!     .role_arn("arn:aws:iam::000000000000:role/personalize")
//!     .build();
//! ```

use std::sync::Arc;

use log::debug;

use crate::engine::FlowEngine;
use crate::event::{EventStore, InMemoryEventStore};
use crate::model::DataLocation;
use crate::provider::{ProviderError, ResourceProvider, StorageAccess};
use crate::stage::{EngineSettings, SchemaPolicy};
use crate::teardown::TeardownEngine;

pub struct EngineBuilder<E: EventStore = InMemoryEventStore> {
    provider: Arc<dyn ResourceProvider>,
    storage: Option<Arc<dyn StorageAccess>>,
    settings: EngineSettings,
    event_store: E,
}

impl EngineBuilder<InMemoryEventStore> {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider,
               storage: None,
               settings: EngineSettings::default(),
               event_store: InMemoryEventStore::default() }
    }
}

impl<E: EventStore> EngineBuilder<E> {
    pub fn storage(mut self, storage: Arc<dyn StorageAccess>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Reemplaza todos los ajustes de una vez (p. ej. desde la configuración
    /// del host).
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.settings.role_arn = role_arn.into();
        self
    }

    pub fn min_provisioned_tps(mut self, tps: u64) -> Self {
        self.settings.min_provisioned_tps = tps;
        self
    }

    pub fn schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.settings.schema_policy = policy;
        self
    }

    /// Cambia el store de eventos (y con él el tipo del builder).
    pub fn event_store<E2: EventStore>(self, event_store: E2) -> EngineBuilder<E2> {
        EngineBuilder { provider: self.provider,
                        storage: self.storage,
                        settings: self.settings,
                        event_store }
    }

    pub fn build(self) -> FlowEngine<E> {
        let storage = self.storage.unwrap_or_else(|| Arc::new(NoStorageAccess));
        FlowEngine::from_parts(self.provider, storage, self.settings, self.event_store)
    }

    pub fn build_teardown(self) -> TeardownEngine<E> {
        TeardownEngine::from_parts(self.provider, self.settings, self.event_store)
    }
}

/// Storage por defecto: no concede nada.
#[derive(Debug, Default)]
pub struct NoStorageAccess;

impl StorageAccess for NoStorageAccess {
    fn grant_read_access(&self, location: &DataLocation) -> Result<(), ProviderError> {
        debug!("grant_read_access:noop bucket={}", location.bucket);
        Ok(())
    }

    fn grant_read_write_access(&self, location: &DataLocation) -> Result<(), ProviderError> {
        debug!("grant_read_write_access:noop bucket={}", location.bucket);
        Ok(())
    }
}
