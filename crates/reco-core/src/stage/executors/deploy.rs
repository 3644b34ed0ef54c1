use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{resolve_or_create, StageEnv, StageExecutor, StageOutput};
use crate::stage::Stage;

/// Campaign sobre la versión entrenada. Sólo corre con `deploy = true`.
#[derive(Debug, Default)]
pub struct CampaignExecutor;

impl StageExecutor for CampaignExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let stage = Stage::Campaign.as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?;
        let suffix = ctx.require_non_empty(stage, keys::SUFFIX)?;
        let solution = ctx.require_non_empty(stage, keys::SOLUTION_ARN)?;
        let version = ctx.require_non_empty(stage, keys::SOLUTION_VERSION_ARN)?;
        let tps = ctx.number(keys::MIN_PROVISIONED_TPS)
                     .unwrap_or(env.settings.min_provisioned_tps);

        let campaign_name = format!("{name}-{suffix}");
        let mut spec = ResourceSpec::new(campaign_name.as_str()).with_attr(attrs::SOLUTION_VERSION_ARN, version)
                                                                .with_attr(attrs::MIN_PROVISIONED_TPS, tps);
        if let Some(config) = ctx.document_value(keys::CAMPAIGN_CONFIG)? {
            spec = spec.with_attr(attrs::CAMPAIGN_CONFIG, config);
        }
        let (handle, created) = resolve_or_create(env, stage, ResourceKind::Campaign, Some(solution), &spec)?;

        ctx.set(keys::CAMPAIGN_ARN, handle.arn.as_str());
        ctx.set(keys::CAMPAIGN_NAME, campaign_name);
        Ok(StageOutput::new(ctx).resolved(&handle, created))
    }
}

/// Recommender de dominio: cierra los pipelines de casos de uso en lugar de
/// SOLUTION/CAMPAIGN.
///
/// El pipeline de dominio lo nombra como el grupo; el de casos de uso crea
/// uno por corrida (`{name}-{suffix}`) sobre un grupo existente.
#[derive(Debug, Default)]
pub struct RecommenderExecutor {
    pub per_run: bool,
}

impl RecommenderExecutor {
    pub fn named_after_group() -> Self {
        Self { per_run: false }
    }

    pub fn per_run() -> Self {
        Self { per_run: true }
    }
}

impl StageExecutor for RecommenderExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let stage = Stage::Recommender.as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?;
        let group = ctx.require_non_empty(stage, keys::DATASET_GROUP_ARN)?;
        let recipe = ctx.require_non_empty(stage, keys::RECIPE_ARN)?;
        let recommender_name = if self.per_run {
            format!("{name}-{}", ctx.require_non_empty(stage, keys::SUFFIX)?)
        } else {
            name.to_string()
        };

        let mut spec = ResourceSpec::new(recommender_name).with_attr(attrs::RECIPE_ARN, recipe);
        if let Some(config) = ctx.document_value(keys::RECOMMENDER_CONFIG)? {
            spec = spec.with_attr(attrs::RECOMMENDER_CONFIG, config);
        }
        let (handle, created) = resolve_or_create(env, stage, ResourceKind::Recommender, Some(group), &spec)?;

        ctx.set(keys::RECOMMENDER_ARN, handle.arn.as_str());
        Ok(StageOutput::new(ctx).resolved(&handle, created))
    }
}
