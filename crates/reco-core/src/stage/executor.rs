//! Contrato de los Stage Executors y utilidades comunes.

use std::fmt::Debug;

use log::{debug, info};

use crate::constants::DEFAULT_MIN_PROVISIONED_TPS;
use crate::errors::FlowError;
use crate::model::{PipelineContext, ResourceHandle, ResourceKind};
use crate::provider::{ResourceProvider, ResourceSpec, StorageAccess};

/// Qué hacer con los schemas durante el teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Los schemas pueden estar compartidos: el stage SCHEMA no borra nada.
    #[default]
    Retain,
    /// Borrado best-effort; los rechazos (schema en uso) se conservan.
    Delete,
}

impl SchemaPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" => Some(SchemaPolicy::Retain),
            "delete" => Some(SchemaPolicy::Delete),
            _ => None,
        }
    }
}

/// Ajustes de despliegue que los ejecutores no leen del contexto.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Rol que el backend asume para leer los datos de importación.
    pub role_arn: String,
    pub min_provisioned_tps: u64,
    pub schema_policy: SchemaPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { role_arn: String::new(),
               min_provisioned_tps: DEFAULT_MIN_PROVISIONED_TPS,
               schema_policy: SchemaPolicy::Retain }
    }
}

/// Colaboradores visibles para un ejecutor durante un step.
pub struct StageEnv<'a> {
    pub provider: &'a dyn ResourceProvider,
    pub storage: &'a dyn StorageAccess,
    pub settings: &'a EngineSettings,
}

/// Recurso resuelto por un ejecutor; `created == false` indica reutilización.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub kind: ResourceKind,
    pub arn: String,
    pub created: bool,
}

impl ResolvedResource {
    pub fn new(handle: &ResourceHandle, created: bool) -> Self {
        Self { kind: handle.kind,
               arn: handle.arn.clone(),
               created }
    }
}

/// Resultado de ejecutar un stage: contexto sucesor + recursos resueltos.
#[derive(Debug)]
pub struct StageOutput {
    pub context: PipelineContext,
    pub resources: Vec<ResolvedResource>,
}

impl StageOutput {
    pub fn new(context: PipelineContext) -> Self {
        Self { context,
               resources: Vec::new() }
    }

    pub fn resolved(mut self, handle: &ResourceHandle, created: bool) -> Self {
        self.resources.push(ResolvedResource::new(handle, created));
        self
    }
}

/// Un Stage Executor recibe el contexto por valor y devuelve su sucesor.
///
/// El motor ya verificó los campos `reads` del descriptor y la compuerta;
/// el ejecutor sólo resuelve/crea recursos y escribe sus handles. `stage` y
/// `status` los fija el motor.
pub trait StageExecutor: Send + Sync + Debug {
    fn execute(&self, ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError>;
}

/// Resolución idempotente: lista bajo `parent`, busca por nombre (y
/// variante) y sólo crea si no existe. Devuelve `(handle, created)`.
///
/// Un fallo del `create` es fatal y nunca se reintenta aquí: reintentar
/// podría duplicar recursos.
pub fn resolve_or_create(env: &StageEnv<'_>,
                         stage: &str,
                         kind: ResourceKind,
                         parent: Option<&str>,
                         spec: &ResourceSpec)
                         -> Result<(ResourceHandle, bool), FlowError> {
    if let Some(existing) = find_existing(env, stage, kind, parent, &spec.name, spec.variant.as_deref())? {
        info!("{stage}: reusing {kind} name={} arn={}", spec.name, existing.arn);
        return Ok((existing, false));
    }
    let handle = env.provider
                    .create(kind, parent, spec)
                    .map_err(|e| FlowError::provider(stage, e))?;
    info!("{stage}: created {kind} name={} arn={}", spec.name, handle.arn);
    Ok((handle, true))
}

/// Busca un recurso existente por nombre bajo `parent`.
pub fn find_existing(env: &StageEnv<'_>,
                     stage: &str,
                     kind: ResourceKind,
                     parent: Option<&str>,
                     name: &str,
                     variant: Option<&str>)
                     -> Result<Option<ResourceHandle>, FlowError> {
    let listed = env.provider
                    .list(kind, parent)
                    .map_err(|e| FlowError::provider(stage, e))?;
    debug!("{stage}: list {kind} parent={parent:?} count={}", listed.len());
    Ok(listed.into_iter().find(|h| h.matches(name, variant)))
}
