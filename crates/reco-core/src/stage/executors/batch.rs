use log::info;

use crate::constants::DEFAULT_NUM_RESULTS;
use crate::errors::FlowError;
use crate::model::context::keys;
use crate::model::{DataLocation, PipelineContext, ResourceKind};
use crate::provider::{attrs, ResourceSpec};
use crate::stage::executor::{find_existing, StageEnv, StageExecutor, StageOutput};
use crate::stage::Stage;

/// Tipo de job batch sobre una versión entrenada y sus campos de contexto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchJob {
    /// Recomendaciones por usuario/ítem de un fichero de entrada.
    Inference,
    /// Segmentos de usuarios por ítem o atributo.
    Segment,
}

impl BatchJob {
    pub fn stage(&self) -> Stage {
        match self {
            BatchJob::Inference => Stage::BatchInference,
            BatchJob::Segment => Stage::BatchSegment,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            BatchJob::Inference => ResourceKind::BatchInferenceJob,
            BatchJob::Segment => ResourceKind::BatchSegmentJob,
        }
    }

    pub fn input_field(&self) -> &'static str {
        match self {
            BatchJob::Inference => keys::BATCH_INPUT_PATH,
            BatchJob::Segment => keys::SEGMENT_INPUT_PATH,
        }
    }

    pub fn output_field(&self) -> &'static str {
        match self {
            BatchJob::Inference => keys::BATCH_OUTPUT_PATH,
            BatchJob::Segment => keys::SEGMENT_OUTPUT_PATH,
        }
    }

    pub fn job_field(&self) -> &'static str {
        match self {
            BatchJob::Inference => keys::BATCH_INFERENCE_JOB_ARN,
            BatchJob::Segment => keys::BATCH_SEGMENT_JOB_ARN,
        }
    }
}

/// Lanza (o reutiliza) un job batch `{name}-{suffix}` bajo la versión de
/// solution. Antes del primer `create` concede al backend lectura sobre la
/// entrada y escritura sobre el destino; un job reutilizado no concede nada.
#[derive(Debug)]
pub struct BatchJobExecutor {
    pub job: BatchJob,
}

impl BatchJobExecutor {
    pub fn new(job: BatchJob) -> Self {
        Self { job }
    }
}

impl StageExecutor for BatchJobExecutor {
    fn execute(&self, mut ctx: PipelineContext, env: &StageEnv<'_>) -> Result<StageOutput, FlowError> {
        let job = self.job;
        let stage = job.stage().as_str();
        let name = ctx.require_non_empty(stage, keys::NAME)?;
        let suffix = ctx.require_non_empty(stage, keys::SUFFIX)?;
        let version = ctx.require_non_empty(stage, keys::SOLUTION_VERSION_ARN)?.to_string();
        let input = DataLocation::parse_json_input(ctx.require_non_empty(stage, job.input_field())?)?;
        let output = DataLocation::parse_output_prefix(ctx.require_non_empty(stage, job.output_field())?)?;

        let role = env.settings.role_arn.trim();
        if role.is_empty() {
            return Err(FlowError::Validation(format!("no role ARN configured for {}", stage.to_ascii_lowercase())));
        }

        let job_name = format!("{name}-{suffix}");
        if let Some(existing) = find_existing(env, stage, job.kind(), Some(&version), &job_name, None)? {
            info!("{stage}: reusing {} arn={}", job.kind(), existing.arn);
            ctx.set(job.job_field(), existing.arn.as_str());
            return Ok(StageOutput::new(ctx).resolved(&existing, false));
        }

        let num_results = ctx.number(keys::NUM_RESULTS).unwrap_or(DEFAULT_NUM_RESULTS);
        let mut spec = ResourceSpec::new(job_name.as_str()).with_attr(attrs::SOLUTION_VERSION_ARN, version.as_str())
                                                           .with_attr(attrs::JOB_INPUT, input.uri())
                                                           .with_attr(attrs::JOB_OUTPUT, output.uri())
                                                           .with_attr(attrs::NUM_RESULTS, num_results)
                                                           .with_attr(attrs::ROLE_ARN, role);
        if job == BatchJob::Inference {
            if let Some(config) = ctx.document_value(keys::BATCH_INFERENCE_JOB_CONFIG)? {
                spec = spec.with_attr(attrs::BATCH_INFERENCE_JOB_CONFIG, config);
            }
        }

        for (location, write) in [(&input, false), (&output, true)] {
            let granted = if write {
                env.storage.grant_read_write_access(location)
            } else {
                env.storage.grant_read_access(location)
            };
            granted.map_err(|e| FlowError::provider(stage, e))?;
        }

        let handle = env.provider
                        .create(job.kind(), Some(&version), &spec)
                        .map_err(|e| FlowError::provider(stage, e))?;
        info!("{stage}: started {} name={job_name} arn={}", job.kind(), handle.arn);
        ctx.set(job.job_field(), handle.arn.as_str());
        Ok(StageOutput::new(ctx).resolved(&handle, true))
    }
}
