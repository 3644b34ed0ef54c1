use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::info;
use reco_core::{DataLocation, ProviderError, StorageAccess};
use serde_json::Value;

use crate::policy::{bucket_read_policy, bucket_read_write_policy};

/// Storage simulado: guarda la política vigente por bucket. Conceder dos
/// veces deja la misma política (idempotente) pero cuenta ambas llamadas.
/// Una concesión de lectura no rebaja un bucket que ya tiene escritura.
#[derive(Debug, Default)]
pub struct SimulatedStorage {
    policies: DashMap<String, Value>,
    grants: AtomicU64,
}

impl SimulatedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self, bucket: &str) -> Option<Value> {
        self.policies.get(bucket).map(|p| p.value().clone())
    }

    /// Número de concesiones (lectura o lectura/escritura).
    pub fn grant_count(&self) -> u64 {
        self.grants.load(Ordering::SeqCst)
    }
}

impl StorageAccess for SimulatedStorage {
    fn grant_read_access(&self, location: &DataLocation) -> Result<(), ProviderError> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        self.policies
            .entry(location.bucket.clone())
            .or_insert_with(|| bucket_read_policy(&location.bucket));
        info!("storage:grant bucket={}", location.bucket);
        Ok(())
    }

    fn grant_read_write_access(&self, location: &DataLocation) -> Result<(), ProviderError> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        self.policies.insert(location.bucket.clone(), bucket_read_write_policy(&location.bucket));
        info!("storage:grant_rw bucket={}", location.bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_idempotent_per_bucket() {
        let storage = SimulatedStorage::new();
        let loc = DataLocation::parse("s3://shared/a.csv").unwrap();
        storage.grant_read_access(&loc).unwrap();
        storage.grant_read_access(&loc).unwrap();
        assert_eq!(storage.grant_count(), 2);
        assert_eq!(storage.policy("shared"), Some(bucket_read_policy("shared")));
        assert_eq!(storage.policy("other"), None);
    }

    #[test]
    fn read_grant_keeps_existing_write_access() {
        let storage = SimulatedStorage::new();
        let out = DataLocation::parse_output_prefix("s3://shared/out/").unwrap();
        let input = DataLocation::parse_json_input("s3://shared/in.json").unwrap();
        storage.grant_read_write_access(&out).unwrap();
        storage.grant_read_access(&input).unwrap();
        assert_eq!(storage.policy("shared"), Some(bucket_read_write_policy("shared")));
        assert_eq!(storage.grant_count(), 2);
    }
}
