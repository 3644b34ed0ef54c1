//! Backend simulado en proceso.
//!
//! Reglas que reproduce del servicio real:
//! - Nombres únicos por tipo y padre (`AlreadyExists`), un solo event
//!   tracker por dataset group.
//! - Creación asíncrona: tras `create` el recurso reporta `CREATE
//!   IN_PROGRESS` durante `settle_after` describes y luego `ACTIVE`. Los
//!   schemas quedan activos al instante.
//! - Borrado asíncrono: el recurso sigue listándose durante `settle_after`
//!   consultas y luego desaparece.
//! - Un padre con dependientes no se puede borrar (`Rejected`); un schema
//!   referenciado por un dataset tampoco.
//! - Jobs de importación, versiones y jobs batch no tienen borrado propio:
//!   desaparecen con su dataset o solution.
//!
//! Todas las llamadas quedan en un journal ordenado para que los tests
//! verifiquen orden y cantidad.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::{debug, info};
use reco_core::provider::attrs;
use reco_core::{ProviderError, ResourceDescription, ResourceHandle, ResourceKind, ResourceProvider, ResourceSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ARN_PREFIX: &str = "arn:aws:personalize:us-east-1:000000000000:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Creating { remaining: u32 },
    Active,
    Deleting { remaining: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedResource {
    pub handle: ResourceHandle,
    pub attributes: Map<String, Value>,
    pub phase: Phase,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOp {
    Create,
    Describe,
    List,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCall {
    pub op: CallOp,
    pub kind: ResourceKind,
    /// Nombre (create), ARN (describe/delete) o padre (list).
    pub target: String,
}

/// Estado persistible del backend (sin journal ni estados forzados).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatedState {
    pub settle_after: u32,
    pub next_seq: u64,
    pub resources: Vec<SimulatedResource>,
}

#[derive(Debug, Default)]
pub struct SimulatedProvider {
    resources: DashMap<String, SimulatedResource>,
    journal: DashMap<u64, ProviderCall>,
    forced: DashMap<ResourceKind, String>,
    call_seq: AtomicU64,
    resource_seq: AtomicU64,
    settle_after: u32,
}

fn arn_segment(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Schema => "schema",
        ResourceKind::DatasetGroup => "dataset-group",
        ResourceKind::Dataset => "dataset",
        ResourceKind::DatasetImportJob => "dataset-import-job",
        ResourceKind::EventTracker => "event-tracker",
        ResourceKind::Solution | ResourceKind::SolutionVersion => "solution",
        ResourceKind::Campaign => "campaign",
        ResourceKind::Recommender => "recommender",
        ResourceKind::BatchInferenceJob => "batch-inference-job",
        ResourceKind::BatchSegmentJob => "batch-segment-job",
    }
}

fn requires_parent(kind: ResourceKind) -> bool {
    !matches!(kind, ResourceKind::Schema | ResourceKind::DatasetGroup)
}

impl SimulatedProvider {
    /// Backend que completa cada operación en la primera consulta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Número de consultas que un recurso pasa en estado intermedio.
    pub fn with_settle_after(mut self, polls: u32) -> Self {
        self.settle_after = polls;
        self
    }

    pub fn from_state(state: SimulatedState) -> Self {
        let provider = Self { settle_after: state.settle_after,
                              resource_seq: AtomicU64::new(state.next_seq),
                              ..Self::default() };
        for r in state.resources {
            provider.resources.insert(r.handle.arn.clone(), r);
        }
        provider
    }

    pub fn snapshot(&self) -> SimulatedState {
        let mut resources: Vec<SimulatedResource> = self.resources.iter().map(|r| r.value().clone()).collect();
        resources.sort_by_key(|r| r.seq);
        SimulatedState { settle_after: self.settle_after,
                         next_seq: self.resource_seq.load(Ordering::SeqCst),
                         resources }
    }

    /// Todo `describe` de `kind` devuelve `raw` (vocabulario del backend).
    pub fn force_status(&self, kind: ResourceKind, raw: &str) {
        self.forced.insert(kind, raw.to_string());
    }

    pub fn clear_forced(&self) {
        self.forced.clear();
    }

    /// Crea un recurso ya activo sin pasar por el journal (estado previo de
    /// un test).
    pub fn seed(&self, kind: ResourceKind, parent: Option<&str>, spec: &ResourceSpec) -> Result<ResourceHandle, ProviderError> {
        self.insert(kind, parent, spec, Phase::Active)
    }

    /// Journal en orden de llamada.
    pub fn calls(&self) -> Vec<ProviderCall> {
        let mut calls: Vec<(u64, ProviderCall)> = self.journal.iter().map(|e| (*e.key(), e.value().clone())).collect();
        calls.sort_by_key(|(seq, _)| *seq);
        calls.into_iter().map(|(_, c)| c).collect()
    }

    pub fn count(&self, op: CallOp, kind: ResourceKind) -> usize {
        self.journal.iter().filter(|e| e.op == op && e.kind == kind).count()
    }

    pub fn count_op(&self, op: CallOp) -> usize {
        self.journal.iter().filter(|e| e.op == op).count()
    }

    pub fn clear_journal(&self) {
        self.journal.clear();
    }

    pub fn resource_count(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.handle.kind == kind).count()
    }

    pub fn contains(&self, arn: &str) -> bool {
        self.resources.contains_key(arn)
    }

    fn record(&self, op: CallOp, kind: ResourceKind, target: &str) {
        let seq = self.call_seq.fetch_add(1, Ordering::SeqCst);
        debug!("sim:{op:?} seq={seq} kind={kind} target={target}");
        self.journal.insert(seq, ProviderCall { op,
                                                kind,
                                                target: target.to_string() });
    }

    fn insert(&self, kind: ResourceKind, parent: Option<&str>, spec: &ResourceSpec, phase: Phase) -> Result<ResourceHandle, ProviderError> {
        let seq = self.resource_seq.fetch_add(1, Ordering::SeqCst);
        let arn = match (kind, parent) {
            (ResourceKind::SolutionVersion, Some(solution)) => format!("{solution}/{seq:08x}"),
            (ResourceKind::Dataset, _) => format!("{ARN_PREFIX}dataset/{}/{}", spec.name, spec.variant.as_deref().unwrap_or("INTERACTIONS")),
            _ => format!("{ARN_PREFIX}{}/{}", arn_segment(kind), spec.name),
        };
        if self.resources.contains_key(&arn) {
            return Err(ProviderError::AlreadyExists(arn));
        }
        let mut handle = ResourceHandle::new(kind, arn.as_str(), spec.name.as_str());
        if let Some(p) = parent {
            handle = handle.with_parent(p);
        }
        if let Some(v) = &spec.variant {
            handle = handle.with_variant(v.as_str());
        }
        self.resources.insert(arn,
                              SimulatedResource { handle: handle.clone(),
                                                  attributes: spec.attributes.clone(),
                                                  phase,
                                                  seq });
        Ok(handle)
    }

    fn live_children(&self, kinds: &[ResourceKind], parent: &str) -> usize {
        self.resources
            .iter()
            .filter(|r| kinds.contains(&r.handle.kind) && r.handle.parent.as_deref() == Some(parent))
            .count()
    }

    fn conflict(&self, kind: ResourceKind, parent: Option<&str>, spec: &ResourceSpec) -> Option<String> {
        if kind == ResourceKind::SolutionVersion {
            return None;
        }
        self.resources
            .iter()
            .find(|r| {
                let h = &r.handle;
                h.kind == kind
                && h.parent.as_deref() == parent
                && (kind == ResourceKind::EventTracker || (h.name == spec.name && h.variant == spec.variant))
            })
            .map(|r| r.handle.arn.clone())
    }
}

impl ResourceProvider for SimulatedProvider {
    fn create(&self, kind: ResourceKind, parent: Option<&str>, spec: &ResourceSpec) -> Result<ResourceHandle, ProviderError> {
        self.record(CallOp::Create, kind, &spec.name);
        if requires_parent(kind) && parent.is_none() {
            return Err(ProviderError::Rejected(format!("{kind} requires a parent")));
        }
        if let Some(p) = parent {
            match self.resources.get(p).map(|r| r.phase) {
                None | Some(Phase::Deleting { .. }) => return Err(ProviderError::NotFound(p.to_string())),
                Some(_) => {}
            }
        }
        if let Some(existing) = self.conflict(kind, parent, spec) {
            return Err(ProviderError::AlreadyExists(existing));
        }

        let phase = if kind == ResourceKind::Schema || self.settle_after == 0 {
            Phase::Active
        } else {
            Phase::Creating { remaining: self.settle_after }
        };
        let handle = self.insert(kind, parent, spec, phase)?;
        info!("sim:created kind={kind} arn={}", handle.arn);
        Ok(handle)
    }

    fn describe(&self, kind: ResourceKind, arn: &str) -> Result<ResourceDescription, ProviderError> {
        self.record(CallOp::Describe, kind, arn);
        let not_found = || ProviderError::NotFound(arn.to_string());

        let (description, gone) = {
            let mut entry = self.resources.get_mut(arn).ok_or_else(not_found)?;
            if entry.handle.kind != kind {
                return Err(not_found());
            }
            let (next, progress) = match entry.phase {
                Phase::Creating { remaining: 0 } | Phase::Active => (Phase::Active, "ACTIVE"),
                Phase::Creating { remaining } => (Phase::Creating { remaining: remaining - 1 }, "CREATE IN_PROGRESS"),
                Phase::Deleting { remaining: 0 } => (entry.phase, "DELETED"),
                Phase::Deleting { remaining } => (Phase::Deleting { remaining: remaining - 1 }, "DELETE IN_PROGRESS"),
            };
            entry.phase = next;
            let status = self.forced
                             .get(&kind)
                             .map(|s| s.value().clone())
                             .unwrap_or_else(|| progress.to_string());
            (ResourceDescription { handle: entry.handle.clone(),
                                   status,
                                   attributes: entry.attributes.clone() },
             progress == "DELETED")
        };
        if gone {
            self.resources.remove(arn);
            return Err(not_found());
        }
        Ok(description)
    }

    fn list(&self, kind: ResourceKind, parent: Option<&str>) -> Result<Vec<ResourceHandle>, ProviderError> {
        self.record(CallOp::List, kind, parent.unwrap_or(""));
        if let Some(p) = parent {
            if !self.resources.contains_key(p) {
                return Err(ProviderError::NotFound(p.to_string()));
            }
        }

        let mut keys: Vec<(u64, String)> = self.resources
                                               .iter()
                                               .filter(|r| r.handle.kind == kind && r.handle.parent.as_deref() == parent)
                                               .map(|r| (r.seq, r.key().clone()))
                                               .collect();
        keys.sort();

        let mut listed = Vec::with_capacity(keys.len());
        for (_, arn) in keys {
            let gone = match self.resources.get_mut(&arn) {
                Some(mut r) => match r.phase {
                    Phase::Deleting { remaining: 0 } => true,
                    Phase::Deleting { remaining } => {
                        r.phase = Phase::Deleting { remaining: remaining - 1 };
                        listed.push(r.handle.clone());
                        false
                    }
                    _ => {
                        listed.push(r.handle.clone());
                        false
                    }
                },
                None => false,
            };
            if gone {
                self.resources.remove(&arn);
            }
        }
        Ok(listed)
    }

    fn delete(&self, kind: ResourceKind, arn: &str) -> Result<(), ProviderError> {
        self.record(CallOp::Delete, kind, arn);
        match self.resources.get(arn).map(|r| (r.handle.kind, r.phase)) {
            Some((k, _)) if k != kind => return Err(ProviderError::NotFound(arn.to_string())),
            None => return Err(ProviderError::NotFound(arn.to_string())),
            Some((_, Phase::Deleting { .. })) => return Ok(()),
            Some(_) => {}
        }

        let blockers = match kind {
            ResourceKind::DatasetGroup => self.live_children(&[ResourceKind::Dataset,
                                                                ResourceKind::Solution,
                                                                ResourceKind::EventTracker,
                                                                ResourceKind::Recommender],
                                                              arn),
            ResourceKind::Solution => self.live_children(&[ResourceKind::Campaign], arn),
            ResourceKind::Schema => self.resources
                                        .iter()
                                        .filter(|r| {
                                            r.handle.kind == ResourceKind::Dataset
                                            && r.attributes.get(attrs::SCHEMA_ARN).and_then(Value::as_str) == Some(arn)
                                        })
                                        .count(),
            _ => 0,
        };
        if blockers > 0 {
            return Err(ProviderError::Rejected(format!("{kind} {arn} still has {blockers} dependent resource(s)")));
        }

        // Jobs de importación y versiones no se borran por separado; los jobs
        // batch cuelgan de una versión.
        let mut cascaded: Vec<String> = self.resources
                                            .iter()
                                            .filter(|r| {
                                                matches!(r.handle.kind, ResourceKind::DatasetImportJob | ResourceKind::SolutionVersion)
                                                && r.handle.parent.as_deref() == Some(arn)
                                            })
                                            .map(|r| r.key().clone())
                                            .collect();
        let batch_jobs: Vec<String> = self.resources
                                          .iter()
                                          .filter(|r| {
                                              matches!(r.handle.kind, ResourceKind::BatchInferenceJob | ResourceKind::BatchSegmentJob)
                                              && r.handle.parent.as_ref().is_some_and(|p| cascaded.contains(p))
                                          })
                                          .map(|r| r.key().clone())
                                          .collect();
        cascaded.extend(batch_jobs);
        for child in cascaded {
            self.resources.remove(&child);
        }

        if self.settle_after == 0 {
            self.resources.remove(arn);
        } else if let Some(mut r) = self.resources.get_mut(arn) {
            r.phase = Phase::Deleting { remaining: self.settle_after };
        }
        info!("sim:deleted kind={kind} arn={arn}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(p: &SimulatedProvider, name: &str) -> ResourceHandle {
        p.create(ResourceKind::DatasetGroup, None, &ResourceSpec::new(name)).unwrap()
    }

    #[test]
    fn create_settles_after_configured_polls() {
        let p = SimulatedProvider::new().with_settle_after(2);
        let g = group(&p, "demo");
        let status = |p: &SimulatedProvider| p.describe(ResourceKind::DatasetGroup, &g.arn).unwrap().status;
        assert_eq!(status(&p), "CREATE IN_PROGRESS");
        assert_eq!(status(&p), "CREATE IN_PROGRESS");
        assert_eq!(status(&p), "ACTIVE");
        assert_eq!(p.count(CallOp::Describe, ResourceKind::DatasetGroup), 3);
    }

    #[test]
    fn names_are_unique_per_kind_and_parent() {
        let p = SimulatedProvider::new();
        group(&p, "demo");
        let err = p.create(ResourceKind::DatasetGroup, None, &ResourceSpec::new("demo")).unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
    }

    #[test]
    fn one_event_tracker_per_group() {
        let p = SimulatedProvider::new();
        let g = group(&p, "demo");
        p.create(ResourceKind::EventTracker, Some(&g.arn), &ResourceSpec::new("a")).unwrap();
        let err = p.create(ResourceKind::EventTracker, Some(&g.arn), &ResourceSpec::new("b")).unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
    }

    #[test]
    fn parent_with_children_cannot_be_deleted() {
        let p = SimulatedProvider::new();
        let g = group(&p, "demo");
        let ds = p.create(ResourceKind::Dataset,
                          Some(&g.arn),
                          &ResourceSpec::new("demo").with_variant("INTERACTIONS"))
                  .unwrap();
        assert!(matches!(p.delete(ResourceKind::DatasetGroup, &g.arn), Err(ProviderError::Rejected(_))));

        p.delete(ResourceKind::Dataset, &ds.arn).unwrap();
        p.delete(ResourceKind::DatasetGroup, &g.arn).unwrap();
        assert!(p.list(ResourceKind::DatasetGroup, None).unwrap().is_empty());
    }

    #[test]
    fn deletion_is_listed_until_settled() {
        let p = SimulatedProvider::new().with_settle_after(1);
        let g = p.seed(ResourceKind::DatasetGroup, None, &ResourceSpec::new("demo")).unwrap();
        p.delete(ResourceKind::DatasetGroup, &g.arn).unwrap();
        assert_eq!(p.list(ResourceKind::DatasetGroup, None).unwrap().len(), 1);
        assert!(p.list(ResourceKind::DatasetGroup, None).unwrap().is_empty());
        assert!(matches!(p.delete(ResourceKind::DatasetGroup, &g.arn), Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn forced_status_overrides_progression() {
        let p = SimulatedProvider::new();
        let g = group(&p, "demo");
        p.force_status(ResourceKind::DatasetGroup, "CREATE FAILED");
        assert_eq!(p.describe(ResourceKind::DatasetGroup, &g.arn).unwrap().status, "CREATE FAILED");
        p.clear_forced();
        assert_eq!(p.describe(ResourceKind::DatasetGroup, &g.arn).unwrap().status, "ACTIVE");
    }

    #[test]
    fn state_survives_json_snapshot() {
        let p = SimulatedProvider::new().with_settle_after(3);
        let g = group(&p, "demo");
        let json = serde_json::to_string(&p.snapshot()).unwrap();

        let restored = SimulatedProvider::from_state(serde_json::from_str(&json).unwrap());
        assert!(restored.contains(&g.arn));
        assert_eq!(restored.describe(ResourceKind::DatasetGroup, &g.arn).unwrap().status, "CREATE IN_PROGRESS");
        let other = restored.create(ResourceKind::DatasetGroup, None, &ResourceSpec::new("other")).unwrap();
        assert_ne!(other.arn, g.arn);
        assert_eq!(restored.snapshot().resources.len(), 2);
    }

    #[test]
    fn batch_jobs_go_away_with_their_solution() {
        let p = SimulatedProvider::new();
        let g = group(&p, "demo");
        let solution = p.create(ResourceKind::Solution, Some(&g.arn), &ResourceSpec::new("demo-1")).unwrap();
        let version = p.create(ResourceKind::SolutionVersion, Some(&solution.arn), &ResourceSpec::new("demo-1")).unwrap();
        let job = p.create(ResourceKind::BatchInferenceJob, Some(&version.arn), &ResourceSpec::new("demo-1")).unwrap();
        assert_eq!(p.describe(ResourceKind::BatchInferenceJob, &job.arn).unwrap().status, "ACTIVE");

        p.delete(ResourceKind::Solution, &solution.arn).unwrap();
        assert!(!p.contains(&version.arn));
        assert!(!p.contains(&job.arn));
    }
}
