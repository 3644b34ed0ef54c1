use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{PipelineContext, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{resolve_or_create, ResolvedResource, StageEnv, StageExecutor, StageOutput};
use crate::stage::Stage;

/// (campo del ARN, campo del documento, etiqueta del nombre)
const SLOTS: [(&str, &str, &str); 3] = [(keys::SCHEMA_ARN, keys::SCHEMA, "interactions"),
                                        (keys::ITEM_SCHEMA_ARN, keys::ITEM_SCHEMA, "items"),
                                        (keys::USER_SCHEMA_ARN, keys::USER_SCHEMA, "users")];

/// Resuelve los schemas del pipeline. Un ARN provisto por el cliente se usa
/// tal cual; si sólo llega la definición, se hace get-or-create por nombre
/// `{name}-{etiqueta}`.
#[derive(Debug, Default)]
pub struct SchemaExecutor;

impl StageExecutor for SchemaExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let stage = Stage::Schema.as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?.to_string();
        let domain = ctx.non_empty(keys::DOMAIN).map(str::to_string);
        let mut resolved = Vec::new();

        for (arn_field, doc_field, label) in SLOTS {
            if ctx.non_empty(arn_field).is_some() {
                continue;
            }
            match ctx.document_value(doc_field)? {
                Some(definition) => {
                    let mut spec = ResourceSpec::new(format!("{name}-{label}")).with_attr(attrs::SCHEMA, definition.to_string());
                    if let Some(d) = &domain {
                        spec = spec.with_attr(attrs::DOMAIN, d.as_str());
                    }
                    let (handle, created) = resolve_or_create(env, stage, ResourceKind::Schema, None, &spec)?;
                    ctx.set(arn_field, handle.arn.as_str());
                    resolved.push(ResolvedResource::new(&handle, created));
                }
                None if arn_field == keys::SCHEMA_ARN => {
                    return Err(FlowError::Validation("either schema_arn or schema must be provided".into()));
                }
                None => ctx.set(arn_field, ""),
            }
        }

        Ok(StageOutput { context: ctx,
                         resources: resolved })
    }
}
