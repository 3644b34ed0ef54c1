use log::info;

use crate::constants::DEFAULT_RECIPE_ARN;
use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceHandle, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{find_existing, resolve_or_create, StageEnv, StageExecutor, StageOutput};
use crate::stage::{ResourceStatus, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingMode {
    #[default]
    Full,
    Update,
}

impl TrainingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Some(TrainingMode::Full),
            "UPDATE" => Some(TrainingMode::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingMode::Full => "FULL",
            TrainingMode::Update => "UPDATE",
        }
    }
}

/// Solution + versión entrenada.
///
/// Con `training_mode = UPDATE` y un `solution_arn` previo se reentrena esa
/// solution en lugar de crear otra. Una solution reutilizada no dispara un
/// segundo entrenamiento si ya tiene la versión de esta corrida, uno en curso
/// o (en FULL) una versión activa.
#[derive(Debug, Default)]
pub struct SolutionExecutor;

impl StageExecutor for SolutionExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let stage = Stage::Solution.as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?;
        let group = ctx.require_non_empty(stage, keys::DATASET_GROUP_ARN)?;
        let suffix = ctx.require_non_empty(stage, keys::SUFFIX)?;
        let mode = match ctx.non_empty(keys::TRAINING_MODE) {
            None => TrainingMode::default(),
            Some(raw) => TrainingMode::parse(raw).ok_or_else(|| FlowError::Validation(format!("unknown training_mode `{raw}`")))?,
        };
        let recipe = ctx.non_empty(keys::RECIPE_ARN).unwrap_or(DEFAULT_RECIPE_ARN).to_string();

        let (solution, created) = match (mode, ctx.non_empty(keys::SOLUTION_ARN)) {
            (TrainingMode::Update, Some(arn)) => {
                let desc = env.provider
                              .describe(ResourceKind::Solution, arn)
                              .map_err(|e| FlowError::provider(stage, e))?;
                info!("{stage}: retraining existing solution arn={arn}");
                (desc.handle, false)
            }
            _ => {
                let mut spec = ResourceSpec::new(format!("{name}-{suffix}")).with_attr(attrs::RECIPE_ARN, recipe.as_str())
                                                                            .with_attr(attrs::PERFORM_HPO, ctx.flag(keys::PERFORM_HPO));
                if let Some(event_type) = ctx.non_empty(keys::EVENT_TYPE) {
                    spec = spec.with_attr(attrs::EVENT_TYPE, event_type);
                }
                if let Some(config) = ctx.document_value(keys::SOLUTION_CONFIG)? {
                    spec = spec.with_attr(attrs::SOLUTION_CONFIG, config);
                }
                resolve_or_create(env, stage, ResourceKind::Solution, Some(group), &spec)?
            }
        };

        // La versión lleva el nombre de la corrida: repetir el step desde el
        // mismo contexto la encuentra (en cualquier estado) y no reentrena.
        let version_name = format!("{name}-{suffix}");
        let reusable = if created {
            None
        } else {
            match find_existing(env, stage, ResourceKind::SolutionVersion, Some(&solution.arn), &version_name, None)? {
                Some(own) => Some(own),
                None => reusable_version(env, stage, &solution.arn, mode)?,
            }
        };
        let (version, version_created) = match reusable {
            Some(v) => {
                info!("{stage}: reusing solution version arn={}", v.arn);
                (v, false)
            }
            None => {
                let spec = ResourceSpec::new(version_name.as_str()).with_attr(attrs::TRAINING_MODE, mode.as_str());
                let v = env.provider
                           .create(ResourceKind::SolutionVersion, Some(&solution.arn), &spec)
                           .map_err(|e| FlowError::provider(stage, e))?;
                info!("{stage}: training started mode={} arn={}", mode.as_str(), v.arn);
                (v, true)
            }
        };

        ctx.set(keys::SOLUTION_ARN, solution.arn.as_str());
        ctx.set(keys::SOLUTION_VERSION_ARN, version.arn.as_str());
        ctx.set(keys::RECIPE_ARN, recipe);
        Ok(StageOutput::new(ctx).resolved(&solution, created)
                                .resolved(&version, version_created))
    }
}

/// Versión que evita reentrenar: una en curso siempre; en FULL además la
/// última activa.
fn reusable_version(env: &StageEnv<'_>,
                    stage: &str,
                    solution_arn: &str,
                    mode: TrainingMode)
                    -> Result<Option<ResourceHandle>, FlowError> {
    let versions = env.provider
                      .list(ResourceKind::SolutionVersion, Some(solution_arn))
                      .map_err(|e| FlowError::provider(stage, e))?;
    let mut latest_active = None;
    for v in versions {
        let desc = env.provider
                      .describe(ResourceKind::SolutionVersion, &v.arn)
                      .map_err(|e| FlowError::provider(stage, e))?;
        match ResourceStatus::from_backend(&desc.status) {
            ResourceStatus::Pending => return Ok(Some(v)),
            ResourceStatus::Active => latest_active = Some(v),
            _ => {}
        }
    }
    Ok(match mode {
        TrainingMode::Full => latest_active,
        TrainingMode::Update => None,
    })
}
