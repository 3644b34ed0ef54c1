use log::{info, warn};

use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{DataLocation, PipelineContext, ResourceHandle, ResourceKind};
use crate::provider::{attrs, ProviderError, ResourceSpec};
use crate::stage::executor::{resolve_or_create, StageEnv, StageExecutor, StageOutput};
use crate::stage::executors::DatasetType;

/// Lanza (o reutiliza) el job de importación de una rama. La rama de
/// interacciones además asegura un event tracker en el grupo.
#[derive(Debug)]
pub struct ImportExecutor {
    pub dataset_type: DatasetType,
}

impl ImportExecutor {
    pub fn new(dataset_type: DatasetType) -> Self {
        Self { dataset_type }
    }
}

impl StageExecutor for ImportExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let kind = self.dataset_type;
        let stage = kind.import_stage().as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?.to_string();
        let dataset = ctx.require_non_empty(stage, kind.dataset_field())?.to_string();
        let suffix = ctx.require_non_empty(stage, keys::SUFFIX)?;
        let location = DataLocation::parse(ctx.require_non_empty(stage, kind.bucket_field())?)?;

        let role = env.settings.role_arn.trim();
        if role.is_empty() {
            return Err(FlowError::Validation("no role ARN configured for dataset import".into()));
        }

        let spec = ResourceSpec::new(kind.job_name(&name, suffix)).with_attr(attrs::DATA_LOCATION, location.uri())
                                                                   .with_attr(attrs::ROLE_ARN, role);
        let (job, created) = resolve_or_create(env, stage, ResourceKind::DatasetImportJob, Some(&dataset), &spec)?;
        ctx.set(kind.job_field(), job.arn.as_str());
        let mut out = StageOutput::new(PipelineContext::new()).resolved(&job, created);

        if kind == DatasetType::Interactions {
            let group = ctx.require_non_empty(stage, keys::DATASET_GROUP_ARN)?.to_string();
            match ensure_event_tracker(env, stage, &group, &name)? {
                Some((tracker, created)) => {
                    ctx.set(keys::EVENT_TRACKER_ARN, tracker.arn.as_str());
                    out = out.resolved(&tracker, created);
                }
                None => ctx.set(keys::EVENT_TRACKER_ARN, ""),
            }
        }

        out.context = ctx;
        Ok(out)
    }
}

/// Un grupo admite un único tracker: se reutiliza el existente. Si el
/// `create` choca con uno concurrente (`AlreadyExists`) se vuelve a listar.
fn ensure_event_tracker(env: &StageEnv<'_>,
                        stage: &str,
                        group: &str,
                        name: &str)
                        -> Result<Option<(ResourceHandle, bool)>, FlowError> {
    let list = |env: &StageEnv<'_>| {
        env.provider
           .list(ResourceKind::EventTracker, Some(group))
           .map_err(|e| FlowError::provider(stage, e))
    };

    if let Some(existing) = list(env)?.into_iter().next() {
        info!("{stage}: reusing event tracker arn={}", existing.arn);
        return Ok(Some((existing, false)));
    }
    match env.provider.create(ResourceKind::EventTracker, Some(group), &ResourceSpec::new(name)) {
        Ok(handle) => {
            info!("{stage}: created event tracker arn={}", handle.arn);
            Ok(Some((handle, true)))
        }
        Err(ProviderError::AlreadyExists(msg)) => {
            warn!("{stage}: event tracker already exists: {msg}");
            Ok(list(env)?.into_iter().next().map(|h| (h, false)))
        }
        Err(e) => Err(FlowError::provider(stage, e)),
    }
}
