mod common;

use std::sync::Arc;
use std::time::Duration;

use adapters::mock::{MockNode, MOCK_NODE_ID};
use backend::database::MemoryStore;
use backend::publisher::MetricPublisher;
use backend::services::models::{Environment, MetricKind, SnapshotEvent};
use backend::services::scheduler::{OutcomeStatus, PublishStatus};
use backend::services::{DispatchOutcome, Lifecycle, MetricOne, MetricRegistry, MetricState, Scheduler};
use backend::Config;
use tokio::sync::mpsc::UnboundedReceiver;

use common::{init_tracing, node_with_bob, Call, RecordingPublisher, SlowNode};

const INIT_DELAY: Duration = Duration::from_secs(5);
const UPDATE_INTERVAL: Duration = Duration::from_secs(60);

fn scheduler(
    store: &MemoryStore,
    node: &MockNode,
    publisher: Option<Arc<dyn MetricPublisher>>,
    config: Config,
) -> (Scheduler, UnboundedReceiver<DispatchOutcome>) {
    let mut registry = MetricRegistry::new();
    registry
        .register(Box::new(MetricOne::new(
            MOCK_NODE_ID,
            Environment::detect(),
            Arc::new(store.clone()),
        )))
        .unwrap();
    Scheduler::new(registry, Arc::new(node.clone()), publisher, config)
}

fn config() -> Config {
    Config::new()
        .init_delay(INIT_DELAY)
        .update_interval(UPDATE_INTERVAL)
}

fn stored_events(store: &MemoryStore) -> Vec<SnapshotEvent> {
    let latest = store.latest().expect("something was stored");
    MetricState::from_json(&latest.document)
        .unwrap()
        .history()
        .iter()
        .map(|snapshot| snapshot.event)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn init_fires_once_then_updates_recur() {
    init_tracing();
    let store = MemoryStore::new();
    let node = node_with_bob();
    let (scheduler, mut outcomes) = scheduler(&store, &node, None, config());
    let started = tokio::time::Instant::now();
    scheduler.start().unwrap();

    let init = outcomes.recv().await.unwrap();
    assert_eq!(init.metric, MetricKind::MetricOne);
    assert_eq!(init.lifecycle, Lifecycle::Init);
    assert_eq!(init.status, OutcomeStatus::Completed(PublishStatus::Disabled));
    assert!(started.elapsed() >= INIT_DELAY);

    for _ in 0..3 {
        let update = outcomes.recv().await.unwrap();
        assert_eq!(update.lifecycle, Lifecycle::Update);
        assert!(update.is_completed());
    }
    assert!(started.elapsed() >= UPDATE_INTERVAL * 3);
    assert_eq!(node.calls("get_info"), 1);
    assert_eq!(store.len(), 4);
    assert_eq!(
        stored_events(&store),
        vec![
            SnapshotEvent::OnStart,
            SnapshotEvent::OnUpdate,
            SnapshotEvent::OnUpdate,
            SnapshotEvent::OnUpdate
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_closes_metrics_and_halts_updates() {
    init_tracing();
    let store = MemoryStore::new();
    let node = node_with_bob();
    let (scheduler, mut outcomes) = scheduler(&store, &node, None, config());
    scheduler.start().unwrap();

    assert_eq!(outcomes.recv().await.unwrap().lifecycle, Lifecycle::Init);
    scheduler.stop().unwrap();

    let close = outcomes.recv().await.unwrap();
    assert_eq!(close.lifecycle, Lifecycle::Close);
    assert!(close.is_completed());

    let quiet = tokio::time::timeout(UPDATE_INTERVAL * 10, outcomes.recv()).await;
    assert!(quiet.is_err(), "no update may fire after stop");
    assert_eq!(
        stored_events(&store),
        vec![SnapshotEvent::OnStart, SnapshotEvent::OnClose]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_before_init_delay_skips_init() {
    let store = MemoryStore::new();
    let node = node_with_bob();
    let (scheduler, mut outcomes) = scheduler(&store, &node, None, config());
    scheduler.start().unwrap();
    scheduler.stop().unwrap();

    assert_eq!(outcomes.recv().await.unwrap().lifecycle, Lifecycle::Close);
    let quiet = tokio::time::timeout(UPDATE_INTERVAL * 2, outcomes.recv()).await;
    assert!(quiet.is_err());
    assert_eq!(node.calls("get_info"), 0);
}

#[tokio::test(start_paused = true)]
async fn failures_do_not_stop_later_fires() {
    init_tracing();
    let store = MemoryStore::new();
    let node = node_with_bob();
    node.set_unreachable(true);
    let (scheduler, mut outcomes) = scheduler(&store, &node, None, config());
    scheduler.start().unwrap();

    let init = outcomes.recv().await.unwrap();
    assert_eq!(init.lifecycle, Lifecycle::Init);
    assert!(matches!(init.status, OutcomeStatus::Failed(_)));

    let update = outcomes.recv().await.unwrap();
    assert_eq!(update.lifecycle, Lifecycle::Update);
    assert!(matches!(update.status, OutcomeStatus::Failed(_)));
    assert!(store.is_empty());

    node.set_unreachable(false);
    let update = outcomes.recv().await.unwrap();
    assert!(update.is_completed());
    assert_eq!(stored_events(&store), vec![SnapshotEvent::OnUpdate]);
}

#[tokio::test(start_paused = true)]
async fn publish_follows_persistence() {
    let store = MemoryStore::new();
    let node = node_with_bob();
    let publisher = RecordingPublisher::default();
    let (scheduler, mut outcomes) = scheduler(
        &store,
        &node,
        Some(Arc::new(publisher.clone())),
        config(),
    );
    scheduler.start().unwrap();

    let init = outcomes.recv().await.unwrap();
    assert_eq!(init.status, OutcomeStatus::Completed(PublishStatus::Published));
    let update = outcomes.recv().await.unwrap();
    assert_eq!(update.status, OutcomeStatus::Completed(PublishStatus::Published));

    publisher.set_reject(true);
    let rejected = outcomes.recv().await.unwrap();
    assert!(matches!(
        rejected.status,
        OutcomeStatus::Completed(PublishStatus::Failed(_))
    ));
    assert_eq!(store.len(), 3);
    assert_eq!(
        publisher.calls(),
        vec![
            Call::Init(MOCK_NODE_ID.to_string()),
            Call::Upload(MOCK_NODE_ID.to_string())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn publishing_can_be_disabled() {
    let store = MemoryStore::new();
    let node = node_with_bob();
    let publisher = RecordingPublisher::default();
    let (scheduler, mut outcomes) = scheduler(
        &store,
        &node,
        Some(Arc::new(publisher.clone())),
        config().publish(false),
    );
    scheduler.start().unwrap();

    let init = outcomes.recv().await.unwrap();
    assert_eq!(init.status, OutcomeStatus::Completed(PublishStatus::Disabled));
    assert!(publisher.calls().is_empty());
    assert_eq!(node.calls("sign_message"), 0);
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_the_running_update() {
    init_tracing();
    let store = MemoryStore::new();
    let mut registry = MetricRegistry::new();
    registry
        .register(Box::new(MetricOne::new(
            MOCK_NODE_ID,
            Environment::detect(),
            Arc::new(store.clone()),
        )))
        .unwrap();
    let node = SlowNode {
        inner: node_with_bob(),
        delay: Duration::from_secs(30),
    };
    let (scheduler, mut outcomes) = Scheduler::new(registry, Arc::new(node), None, config());
    let started = tokio::time::Instant::now();
    scheduler.start().unwrap();

    // Init fires at 5s and answers at 35s.
    assert_eq!(outcomes.recv().await.unwrap().lifecycle, Lifecycle::Init);

    // The update fired at 60s is still waiting on the node at 70s.
    tokio::time::sleep_until(started + Duration::from_secs(70)).await;
    assert!(outcomes.try_recv().is_err());
    assert_eq!(store.len(), 1);
    scheduler.stop().unwrap();

    let update = outcomes.recv().await.unwrap();
    assert_eq!(update.lifecycle, Lifecycle::Update);
    assert!(update.is_completed());
    let close = outcomes.recv().await.unwrap();
    assert_eq!(close.lifecycle, Lifecycle::Close);
    assert!(close.is_completed());
    assert!(started.elapsed() >= Duration::from_secs(90));

    assert_eq!(store.len(), 3);
    assert_eq!(
        stored_events(&store),
        vec![
            SnapshotEvent::OnStart,
            SnapshotEvent::OnUpdate,
            SnapshotEvent::OnClose
        ]
    );
}
