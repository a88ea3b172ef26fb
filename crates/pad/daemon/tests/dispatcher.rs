//! End-to-end dispatcher behavior against the in-memory store

use pad_controller::{InMemoryStore, Reconciler, ReconcilerConfig, WorkloadStore};
use pad_daemon::{ControllerRuntime, DaemonConfig, Dispatcher, DispatcherConfig};
use pad_types::{AnomalyDetector, AnomalyDetectorSpec, ObjectKey, Workload};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn start(store: Arc<InMemoryStore>, config: DispatcherConfig) -> (Arc<Dispatcher>, tokio::task::JoinHandle<()>) {
    let reconciler = Arc::new(Reconciler::new(store.clone(), ReconcilerConfig::default()));
    let dispatcher = Dispatcher::new(reconciler, store.clone(), config);
    let handle = tokio::spawn(dispatcher.clone().run(store.subscribe()));
    (dispatcher, handle)
}

async fn wait_for_workload<F>(store: &InMemoryStore, key: &ObjectKey, check: F) -> Workload
where
    F: Fn(&Workload) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(workload) = store.get_workload(key).await.unwrap() {
                if check(&workload) {
                    return workload;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("workload did not converge")
}

#[tokio::test]
async fn test_detector_changes_drive_workload() {
    let store = Arc::new(InMemoryStore::new());
    let (dispatcher, handle) = start(store.clone(), DispatcherConfig::default());

    let detector = store
        .upsert_detector(AnomalyDetector::new(
            "monitoring",
            "pad",
            AnomalyDetectorSpec::default().with_image("x:v1"),
        ))
        .await
        .unwrap();
    let key = detector.key();

    let created = wait_for_workload(&store, &key, |w| w.replicas() == 1).await;
    assert_eq!(created.image(), "x:v1");
    assert_eq!(created.env().len(), 7);

    let mut scaled = detector.clone();
    scaled.spec.replica_count = 3;
    store.upsert_detector(scaled).await.unwrap();

    let patched = wait_for_workload(&store, &key, |w| w.replicas() == 3).await;
    assert_eq!(patched.image(), "x:v1");
    assert_eq!(patched.metadata.uid, created.metadata.uid);

    dispatcher.stop();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_out_of_band_delete_is_recreated() {
    let store = Arc::new(InMemoryStore::new());
    let (dispatcher, handle) = start(store.clone(), DispatcherConfig::default());

    let detector = store
        .upsert_detector(AnomalyDetector::new("default", "pad", AnomalyDetectorSpec::default()))
        .await
        .unwrap();
    let key = detector.key();
    let first = wait_for_workload(&store, &key, |_| true).await;

    // The workload delete event maps back to its owning detector.
    assert!(store.delete_workload(&key).await.unwrap());

    let recreated = wait_for_workload(&store, &key, |w| w.metadata.uid != first.metadata.uid).await;
    assert_eq!(recreated.replicas(), 1);

    dispatcher.stop();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_detectors_stored_before_start_are_picked_up() {
    let store = Arc::new(InMemoryStore::new());
    for name in ["a", "b", "c"] {
        store
            .upsert_detector(AnomalyDetector::new("default", name, AnomalyDetectorSpec::default()))
            .await
            .unwrap();
    }

    let (dispatcher, handle) = start(
        store.clone(),
        DispatcherConfig {
            max_concurrent_reconciles: 1,
            ..DispatcherConfig::default()
        },
    );

    for name in ["a", "b", "c"] {
        wait_for_workload(&store, &ObjectKey::new("default", name), |_| true).await;
    }
    // Resync and create events may both queue a key; each workload is created once.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.workload_writes(), 3);

    dispatcher.stop();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_invalid_detector_is_retried_with_backoff() {
    let store = Arc::new(InMemoryStore::new());
    let (dispatcher, handle) = start(
        store.clone(),
        DispatcherConfig {
            backoff_base_ms: 10,
            backoff_max_secs: 1,
            ..DispatcherConfig::default()
        },
    );

    let detector = store
        .upsert_detector(AnomalyDetector::new(
            "default",
            "pad",
            AnomalyDetectorSpec::default().with_training_window("forever"),
        ))
        .await
        .unwrap();
    let key = detector.key();

    timeout(Duration::from_secs(5), async {
        while dispatcher.failure_count(&key).await < 2 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("failed pass was not retried");
    assert_eq!(store.workload_writes(), 0);

    dispatcher.stop();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_runtime_stops_on_shutdown() {
    let runtime = ControllerRuntime::new(DaemonConfig::default());
    let store = runtime.store().clone();
    store
        .upsert_detector(AnomalyDetector::new("default", "pad", AnomalyDetectorSpec::default()))
        .await
        .unwrap();
    let key = ObjectKey::new("default", "pad");

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let run = tokio::spawn(runtime.run_until(async {
        let _ = rx.await;
    }));

    wait_for_workload(&store, &key, |_| true).await;

    tx.send(()).unwrap();
    timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
