//! Validación de la petición del cliente.
//!
//! Corre una sola vez, al iniciar la corrida y antes de cualquier llamada al
//! backend. Todo rechazo es `FlowError::Validation` y no se reintenta.

use crate::constants::{ECOMMERCE_RECIPE_PREFIX, MAX_NAME_LEN, RECIPE_ARN_PREFIX, VOD_RECIPE_PREFIX};
use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{DataLocation, PipelineContext};
use crate::stage::executors::TrainingMode;
use crate::stage::PipelineKind;

pub const DOMAIN_VIDEO_ON_DEMAND: &str = "VIDEO_ON_DEMAND";
pub const DOMAIN_ECOMMERCE: &str = "ECOMMERCE";

pub fn validate_request(kind: PipelineKind, ctx: &PipelineContext) -> Result<(), FlowError> {
    let name = ctx.require_text("REQUEST", keys::NAME)?;
    validate_name(name)?;

    for field in [keys::BUCKET, keys::ITEM_BUCKET, keys::USER_BUCKET] {
        if let Some(raw) = ctx.non_empty(field) {
            DataLocation::parse(raw)?;
        }
    }

    if let Some(raw) = ctx.non_empty(keys::RECIPE_ARN) {
        if !raw.starts_with(RECIPE_ARN_PREFIX) {
            return Err(FlowError::Validation(format!("recipe_arn must start with `{RECIPE_ARN_PREFIX}`, got `{raw}`")));
        }
    }
    if let Some(raw) = ctx.non_empty(keys::TRAINING_MODE) {
        if TrainingMode::parse(raw).is_none() {
            return Err(FlowError::Validation(format!("training_mode must be FULL or UPDATE, got `{raw}`")));
        }
    }

    match kind {
        PipelineKind::Retrain => Ok(()),
        PipelineKind::Custom => validate_schemas(ctx),
        PipelineKind::Domain => {
            validate_schemas(ctx)?;
            validate_domain(ctx)
        }
        PipelineKind::Usecase => {
            if ctx.non_empty(keys::RECIPE_ARN).is_none() {
                return Err(FlowError::Validation("usecase pipeline requires `recipe_arn`".into()));
            }
            // El dominio lo fija el grupo; si la petición lo trae debe cuadrar con la receta.
            if ctx.non_empty(keys::DOMAIN).is_some() {
                validate_domain(ctx)?;
            }
            Ok(())
        }
        PipelineKind::Batch => validate_batch(ctx),
    }
}

pub fn validate_name(name: &str) -> Result<(), FlowError> {
    let mut chars = name.chars();
    let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if name.len() > MAX_NAME_LEN || !valid_first || !valid_rest {
        return Err(FlowError::Validation(format!("name `{name}` must be 1-{MAX_NAME_LEN} chars of [A-Za-z0-9_-] starting with a letter or digit")));
    }
    Ok(())
}

fn has_schema(ctx: &PipelineContext, arn_field: &str, doc_field: &str) -> Result<bool, FlowError> {
    Ok(ctx.non_empty(arn_field).is_some() || ctx.document_value(doc_field)?.is_some())
}

fn validate_schemas(ctx: &PipelineContext) -> Result<(), FlowError> {
    if !has_schema(ctx, keys::SCHEMA_ARN, keys::SCHEMA)? {
        return Err(FlowError::Validation("either schema_arn or schema must be provided".into()));
    }
    let branches = [(keys::ITEM_BUCKET, keys::ITEM_SCHEMA_ARN, keys::ITEM_SCHEMA),
                    (keys::USER_BUCKET, keys::USER_SCHEMA_ARN, keys::USER_SCHEMA)];
    for (bucket, arn_field, doc_field) in branches {
        if ctx.non_empty(bucket).is_some() && !has_schema(ctx, arn_field, doc_field)? {
            return Err(FlowError::Validation(format!("{bucket} requires {arn_field} or {doc_field}")));
        }
    }
    Ok(())
}

fn validate_domain(ctx: &PipelineContext) -> Result<(), FlowError> {
    let domain = ctx.non_empty(keys::DOMAIN)
                    .ok_or_else(|| FlowError::Validation("domain pipeline requires `domain`".into()))?;
    let prefix = match domain {
        DOMAIN_VIDEO_ON_DEMAND => VOD_RECIPE_PREFIX,
        DOMAIN_ECOMMERCE => ECOMMERCE_RECIPE_PREFIX,
        other => {
            return Err(FlowError::Validation(format!("domain must be {DOMAIN_VIDEO_ON_DEMAND} or {DOMAIN_ECOMMERCE}, got `{other}`")))
        }
    };
    match ctx.non_empty(keys::RECIPE_ARN) {
        Some(recipe) if recipe.starts_with(prefix) => Ok(()),
        Some(recipe) => Err(FlowError::Validation(format!("recipe `{recipe}` does not belong to domain {domain}"))),
        None => Err(FlowError::Validation("domain pipeline requires `recipe_arn`".into())),
    }
}

fn validate_batch(ctx: &PipelineContext) -> Result<(), FlowError> {
    if ctx.non_empty(keys::SOLUTION_VERSION_ARN).is_none() {
        return Err(FlowError::Validation("batch pipeline requires `solution_version_arn`".into()));
    }
    let jobs = [(keys::BATCH_INFERENCE, keys::BATCH_INPUT_PATH, keys::BATCH_OUTPUT_PATH),
                (keys::BATCH_SEGMENT, keys::SEGMENT_INPUT_PATH, keys::SEGMENT_OUTPUT_PATH)];
    let mut requested = 0;
    for (flag, input, output) in jobs.into_iter().filter(|(flag, _, _)| ctx.flag(flag)) {
        requested += 1;
        let raw_input = ctx.non_empty(input)
                           .ok_or_else(|| FlowError::Validation(format!("{flag} requires `{input}`")))?;
        DataLocation::parse_json_input(raw_input)?;
        let raw_output = ctx.non_empty(output)
                            .ok_or_else(|| FlowError::Validation(format!("{flag} requires `{output}`")))?;
        DataLocation::parse_output_prefix(raw_output)?;
    }
    if requested == 0 {
        return Err(FlowError::Validation(format!("batch pipeline requires `{}` or `{}`", keys::BATCH_INFERENCE, keys::BATCH_SEGMENT)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> PipelineContext {
        PipelineContext::new().with("name", "demo")
                              .with("bucket", "s3://b/x.csv")
                              .with("schema_arn", "arn:schema")
    }

    #[test]
    fn accepts_minimal_custom_request() {
        assert_eq!(validate_request(PipelineKind::Custom, &base()), Ok(()));
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("-lead").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
        assert!(validate_name("ok_name-1").is_ok());
    }

    #[test]
    fn rejects_malformed_bucket() {
        let ctx = base().with("item_bucket", "s3://b/items.json")
                        .with("item_schema_arn", "arn:item");
        assert!(matches!(validate_request(PipelineKind::Custom, &ctx), Err(FlowError::Validation(_))));
    }

    #[test]
    fn item_branch_needs_a_schema() {
        let ctx = base().with("item_bucket", "s3://b/items.csv");
        let err = validate_request(PipelineKind::Custom, &ctx).unwrap_err();
        assert!(err.to_string().contains("item_bucket"));

        let ctx = ctx.with("item_schema", json!({"type": "record"}).as_object().cloned().unwrap());
        assert_eq!(validate_request(PipelineKind::Custom, &ctx), Ok(()));
    }

    #[test]
    fn domain_recipe_must_match_domain() {
        let ctx = base().with("domain", "ECOMMERCE")
                        .with("recipe_arn", "arn:aws:personalize:::recipe/aws-vod-top-picks");
        assert!(validate_request(PipelineKind::Domain, &ctx).is_err());

        let ctx = ctx.with("recipe_arn", "arn:aws:personalize:::recipe/aws-ecomm-recommended-for-you");
        assert_eq!(validate_request(PipelineKind::Domain, &ctx), Ok(()));

        let ctx = ctx.with("domain", "RETAIL");
        assert!(validate_request(PipelineKind::Domain, &ctx).is_err());
    }

    #[test]
    fn retrain_does_not_need_schema() {
        let ctx = PipelineContext::new().with("name", "demo")
                                        .with("training_mode", "UPDATE");
        assert_eq!(validate_request(PipelineKind::Retrain, &ctx), Ok(()));
        let ctx = ctx.with("training_mode", "PARTIAL");
        assert!(validate_request(PipelineKind::Retrain, &ctx).is_err());
    }

    #[test]
    fn usecase_needs_a_recipe_matching_any_given_domain() {
        let ctx = PipelineContext::new().with("name", "demo");
        assert!(validate_request(PipelineKind::Usecase, &ctx).is_err());

        let ctx = ctx.with("recipe_arn", "arn:aws:personalize:::recipe/aws-vod-because-you-watched-x");
        assert_eq!(validate_request(PipelineKind::Usecase, &ctx), Ok(()));
        let ctx = ctx.with("domain", "ECOMMERCE");
        assert!(validate_request(PipelineKind::Usecase, &ctx).is_err());
    }

    #[test]
    fn batch_requires_a_version_a_job_and_valid_paths() {
        let ctx = PipelineContext::new().with("name", "demo")
                                        .with("solution_version_arn", "arn:solution/demo/1");
        let err = validate_request(PipelineKind::Batch, &ctx).unwrap_err();
        assert!(err.to_string().contains("batch_inference"));

        let ctx = ctx.with("batch_inference", true)
                     .with("batch_input_path", "s3://in/users.json");
        let err = validate_request(PipelineKind::Batch, &ctx).unwrap_err();
        assert!(err.to_string().contains("batch_output_path"));

        let ctx = ctx.with("batch_output_path", "s3://out/results");
        assert!(validate_request(PipelineKind::Batch, &ctx).is_err());
        let ctx = ctx.with("batch_output_path", "s3://out/results/");
        assert_eq!(validate_request(PipelineKind::Batch, &ctx), Ok(()));

        let ctx = ctx.with("batch_segment", true);
        assert!(validate_request(PipelineKind::Batch, &ctx).is_err());
    }
}
