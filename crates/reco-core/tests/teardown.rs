use std::sync::Arc;

use reco_adapters::{CallOp, SimulatedProvider, SimulatedStorage};
use reco_core::stage::SchemaPolicy;
use reco_core::{FlowCtx, FlowEngine, FlowError, PipelineContext, ResourceKind, ResourceSpec, ResourceStatus, TeardownEngine};
use serde_json::json;
use uuid::Uuid;

fn provision(provider: &Arc<SimulatedProvider>, ctx: PipelineContext) -> PipelineContext {
    let mut engine = FlowEngine::builder(provider.clone()).storage(Arc::new(SimulatedStorage::new()))
                                                          .role_arn("arn:aws:iam::000000000000:role/PersonalizeRole")
                                                          .build();
    FlowCtx::new(&mut engine, ctx).run_to_completion()
                                  .expect("provisioning completes")
                                  .clone()
}

fn demo_request(deploy: bool) -> PipelineContext {
    serde_json::from_value(json!({
        "name": "demo",
        "bucket": "s3://b/x.csv",
        "schema": {"type": "record", "name": "Interactions"},
        "deploy": deploy
    })).unwrap()
}

fn teardown_engine(provider: &Arc<SimulatedProvider>, policy: SchemaPolicy) -> TeardownEngine {
    FlowEngine::builder(provider.clone()).schema_policy(policy)
                                         .build_teardown()
}

fn run_id(ctx: &PipelineContext) -> Uuid {
    Uuid::parse_str(ctx.text("run_id").unwrap()).unwrap()
}

fn deletions(provider: &SimulatedProvider) -> Vec<ResourceKind> {
    provider.calls()
            .into_iter()
            .filter(|c| c.op == CallOp::Delete)
            .map(|c| c.kind)
            .collect()
}

#[test]
fn deletes_in_reverse_dependency_order() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(1));
    provision(&provider, demo_request(true));
    provider.clear_journal();

    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    let done = FlowCtx::new(&mut engine, PipelineContext::new().with("name", "demo")).run_to_completion()
                                                                                     .unwrap()
                                                                                     .clone();
    assert!(done.is_completed());
    assert_eq!(deletions(&provider),
               vec![ResourceKind::Campaign,
                    ResourceKind::Solution,
                    ResourceKind::EventTracker,
                    ResourceKind::Dataset,
                    ResourceKind::DatasetGroup]);

    // cada borrado espera a que el listado del tipo anterior quede vacío
    let calls = provider.calls();
    let delete_at = |kind| calls.iter().position(|c| c.op == CallOp::Delete && c.kind == kind).unwrap();
    let listed_between = |kind, from, to| {
        calls[from..to].iter().any(|c| c.op == CallOp::List && c.kind == kind)
    };
    assert!(listed_between(ResourceKind::Campaign, delete_at(ResourceKind::Campaign), delete_at(ResourceKind::Solution)));
    assert!(listed_between(ResourceKind::Solution, delete_at(ResourceKind::Solution), delete_at(ResourceKind::EventTracker)));
    assert!(listed_between(ResourceKind::Dataset, delete_at(ResourceKind::Dataset), delete_at(ResourceKind::DatasetGroup)));

    for kind in [ResourceKind::Campaign, ResourceKind::Solution, ResourceKind::Dataset, ResourceKind::DatasetGroup] {
        assert_eq!(provider.resource_count(kind), 0, "{kind} left behind");
    }
}

#[test]
fn retain_policy_never_touches_schemas() {
    let provider = Arc::new(SimulatedProvider::new());
    provision(&provider, demo_request(false));
    provider.clear_journal();

    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    FlowCtx::new(&mut engine, PipelineContext::new().with("name", "demo")).run_to_completion()
                                                                          .unwrap();
    assert_eq!(provider.count(CallOp::Delete, ResourceKind::Schema), 0);
    assert_eq!(provider.count(CallOp::Describe, ResourceKind::Schema), 0);
    assert_eq!(provider.resource_count(ResourceKind::Schema), 1);
}

#[test]
fn scenario_c_advances_past_empty_campaign_stage() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(1));
    provision(&provider, demo_request(false));

    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    let ctx = engine.teardown_step(PipelineContext::new().with("name", "demo")).unwrap();

    assert_eq!(ctx.stage(), Some("SOLUTION"));
    assert_eq!(ctx.status(), Some(ResourceStatus::Deleting));
    assert!(ctx.non_empty("dataset_group_arn").is_some());
    assert_eq!(provider.count(CallOp::Delete, ResourceKind::Campaign), 0);

    let variants = engine.event_variants(run_id(&ctx));
    assert_eq!(variants, vec!["I", "F", "D", "P"]);
}

#[test]
fn restarting_from_a_snapshot_is_safe() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(1));
    provision(&provider, demo_request(true));

    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    let first = engine.teardown_step(PipelineContext::new().with("name", "demo")).unwrap();
    assert_eq!(first.stage(), Some("CAMPAIGN"));

    let a = engine.teardown_step(first.clone()).unwrap();
    let b = engine.teardown_step(first).unwrap();
    assert_eq!(a.stage(), Some("SOLUTION"));
    assert!(b.stage().is_some());

    let done = FlowCtx::new(&mut engine, b).run_to_completion().unwrap().clone();
    assert!(done.is_completed());
    assert_eq!(provider.resource_count(ResourceKind::DatasetGroup), 0);
}

#[test]
fn shared_schema_rejection_is_tolerated_and_retained() {
    let provider = Arc::new(SimulatedProvider::new());
    let schema = provider.seed(ResourceKind::Schema, None, &ResourceSpec::new("shared")).unwrap();
    let other = provider.seed(ResourceKind::DatasetGroup, None, &ResourceSpec::new("other")).unwrap();
    provider.seed(ResourceKind::Dataset,
                  Some(&other.arn),
                  &ResourceSpec::new("other").with_variant("INTERACTIONS")
                                             .with_attr("schema_arn", schema.arn.as_str()))
            .unwrap();

    let request = PipelineContext::new().with("name", "demo")
                                        .with("bucket", "s3://b/x.csv")
                                        .with("schema_arn", schema.arn.as_str());
    provision(&provider, request);

    let mut engine = teardown_engine(&provider, SchemaPolicy::Delete);
    let done = FlowCtx::new(&mut engine, PipelineContext::new().with("name", "demo")).run_to_completion()
                                                                                     .unwrap()
                                                                                     .clone();
    assert!(done.is_completed());
    assert_eq!(done.list("retained_schema_arns"), &[schema.arn.clone()]);
    assert!(provider.contains(&schema.arn));
    assert!(provider.contains(&other.arn));
    assert!(engine.event_variants(run_id(&done)).contains(&"T"));
}

#[test]
fn delete_policy_removes_unshared_schema() {
    let provider = Arc::new(SimulatedProvider::new());
    let provisioned = provision(&provider, demo_request(false));
    let schema_arn = provisioned.non_empty("schema_arn").unwrap().to_string();

    let mut engine = teardown_engine(&provider, SchemaPolicy::Delete);
    let done = FlowCtx::new(&mut engine, PipelineContext::new().with("name", "demo")).run_to_completion()
                                                                                     .unwrap()
                                                                                     .clone();
    assert!(done.list("retained_schema_arns").is_empty());
    assert!(!provider.contains(&schema_arn));
    assert_eq!(provider.count(CallOp::Delete, ResourceKind::Schema), 1);
}

#[test]
fn missing_group_completes_without_deletions() {
    let provider = Arc::new(SimulatedProvider::new());
    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);

    let done = engine.teardown_step(PipelineContext::new().with("name", "ghost")).unwrap();
    assert!(done.is_completed());
    assert_eq!(done.stage(), Some("DATASET_GROUP"));
    assert_eq!(done.status(), Some(ResourceStatus::Deleted));
    assert_eq!(provider.count_op(CallOp::Delete), 0);

    assert_eq!(engine.teardown_step(done).unwrap_err(), FlowError::FlowCompleted);
}

#[test]
fn teardown_requires_a_name() {
    let provider = Arc::new(SimulatedProvider::new());
    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    let err = engine.teardown_step(PipelineContext::new()).unwrap_err();
    assert!(matches!(err, FlowError::MissingField { ref field, .. } if field == "name"));
    assert!(provider.calls().is_empty());
}

#[test]
fn batch_jobs_leave_with_their_solution() {
    let provider = Arc::new(SimulatedProvider::new());
    let done = provision(&provider, demo_request(false));
    let job = provider.seed(ResourceKind::BatchInferenceJob,
                            done.text("solution_version_arn"),
                            &ResourceSpec::new("demo-nightly"))
                      .unwrap();

    let mut engine = teardown_engine(&provider, SchemaPolicy::Retain);
    FlowCtx::new(&mut engine, PipelineContext::new().with("name", "demo")).run_to_completion()
                                                                          .unwrap();

    assert!(!provider.contains(&job.arn));
    assert_eq!(provider.resource_count(ResourceKind::BatchInferenceJob), 0);
    assert!(!deletions(&provider).contains(&ResourceKind::BatchInferenceJob));
}
