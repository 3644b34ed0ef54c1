use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reco_adapters::{SimulatedProvider, SimulatedStorage};
use reco_core::{PipelineContext, ResourceKind, ResourceStatus};
use recoflow::{AppConfig, AppError, FlowRunner, Notification, Notifier, Outcome};
use serde_json::json;
use tokio::time::Instant;

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

fn config() -> AppConfig {
    AppConfig { role_arn: "arn:aws:iam::000000000000:role/PersonalizeRole".into(),
                poll_interval: Duration::from_secs(60),
                teardown_poll_interval: Duration::from_secs(30),
                max_polls: 100,
                ..AppConfig::default() }
}

fn request() -> PipelineContext {
    serde_json::from_value(json!({
        "name": "demo",
        "bucket": "s3://b/x.csv",
        "schema": {"type": "record", "name": "Interactions"},
        "deploy": true
    })).unwrap()
}

fn runner(provider: &Arc<SimulatedProvider>, cfg: &AppConfig) -> (FlowRunner, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = FlowRunner::new(cfg, provider.clone(), Arc::new(SimulatedStorage::new())).with_notifier(notifier.clone());
    (runner, notifier)
}

#[tokio::test(start_paused = true)]
async fn provisions_and_tears_down_with_virtual_waits() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(2));
    let (mut runner, notifier) = runner(&provider, &config());

    let start = Instant::now();
    let done = runner.provision(request()).await.unwrap();
    assert!(done.is_completed());
    assert!(done.non_empty("campaign_arn").is_some());
    // cada stage con recurso en progreso espera al menos un intervalo
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(start.elapsed().as_secs() % 60, 0);

    let torn = runner.teardown(PipelineContext::new().with("name", "demo")).await.unwrap();
    assert!(torn.is_completed());
    assert_eq!(provider.resource_count(ResourceKind::DatasetGroup), 0);

    let seen = notifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|n| n.outcome == Outcome::Succeeded));
}

#[tokio::test(start_paused = true)]
async fn never_waits_when_backend_settles_instantly() {
    let provider = Arc::new(SimulatedProvider::new());
    let (mut runner, _) = runner(&provider, &config());

    let start = Instant::now();
    runner.provision(request()).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn failed_training_is_notified_with_stage_and_status() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(1));
    provider.force_status(ResourceKind::SolutionVersion, "CREATE FAILED");
    let (mut runner, notifier) = runner(&provider, &config());

    let err = runner.provision(request()).await.unwrap_err();
    assert!(matches!(err, AppError::Flow(_)));

    let seen = notifier.seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.outcome, Outcome::Failed);
    assert_eq!(last.context.stage(), Some("SOLUTION"));
    assert_eq!(last.context.status(), Some(ResourceStatus::CreateFailed));
    assert!(last.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_polls() {
    let provider = Arc::new(SimulatedProvider::new().with_settle_after(50));
    let cfg = AppConfig { max_polls: 3,
                          ..config() };
    let (mut runner, notifier) = runner(&provider, &cfg);

    let err = runner.provision(request()).await.unwrap_err();
    match &err {
        AppError::Timeout { polls, stage, .. } => {
            assert_eq!(*polls, 3);
            assert_eq!(stage, "DATASET_GROUP");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.context().and_then(|c| c.stage()), Some("DATASET_GROUP"));
    assert_eq!(notifier.seen.lock().unwrap()[0].outcome, Outcome::Failed);
}

#[tokio::test]
async fn completed_context_is_rejected() {
    let provider = Arc::new(SimulatedProvider::new());
    let (mut runner, notifier) = runner(&provider, &config());
    let done = PipelineContext::new().with("name", "demo").with("completed", true);
    assert!(matches!(runner.provision(done).await, Err(AppError::Flow(_))));
    assert!(notifier.seen.lock().unwrap().is_empty());
}
