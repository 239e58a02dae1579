//! End-to-end watchdog tests over the in-memory broker.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use commit_watch::domains::watchdog::{ShutdownPolicy, WatchdogConfig, WatchdogService};
use commit_watch::kernel::{Service, ServiceHost, TestBroker, TestCompletionCallback};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn spawn_service(
    broker: &TestBroker,
    callback: &TestCompletionCallback,
    config: WatchdogConfig,
) -> (CancellationToken, JoinHandle<anyhow::Result<()>>) {
    let service = WatchdogService::new(
        Arc::new(broker.clone()),
        Arc::new(callback.clone()),
        config,
    );
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(Box::new(service).run(shutdown.clone()));
    (shutdown, task)
}

fn transaction_id() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test(start_paused = true)]
async fn completed_transaction_never_fires() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();
    let tx = transaction_id();

    broker.publish("control", tx.clone(), "/orders/1/done");
    broker.publish("control", tx, "");

    let (_shutdown, _task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(callback.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missed_deadline_fires_callback_once() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();

    let (_shutdown, _task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    broker.publish("control", transaction_id(), "/orders/2/done");

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(callback.call_count(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(callback.calls(), vec!["/orders/2/done".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn restarted_transaction_only_fires_latest_callback() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();
    let tx = transaction_id();

    let (_shutdown, _task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    broker.publish("control", tx.clone(), "/first");
    tokio::time::sleep(Duration::from_secs(5)).await;
    broker.publish("control", tx, "/second");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(callback.calls(), vec!["/second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn non_utf8_keys_are_distinct_transactions() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();

    let (_shutdown, _task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    broker.publish("control", Bytes::from_static(&[0xff]), "/a");
    broker.publish("control", Bytes::from_static(&[0xfe]), "/b");
    tokio::time::sleep(Duration::from_secs(30)).await;

    let mut calls = callback.calls();
    calls.sort();
    assert_eq!(calls, vec!["/a".to_string(), "/b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unknown_and_keyless_messages_are_skipped() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();

    broker.publish("control", transaction_id(), "");
    broker.publish("control", "", "/no-key");
    broker.publish("control", "tx-after", "/after");

    let (_shutdown, task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(!task.is_finished());
    assert_eq!(callback.calls(), vec!["/after".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn uses_configured_topic_and_group() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();
    let config = WatchdogConfig {
        control_topic: "control.v2".to_string(),
        group: Some("monitors".to_string()),
        timeout: Duration::from_secs(3),
        ..WatchdogConfig::default()
    };

    let (_shutdown, _task) = spawn_service(&broker, &callback, config);
    broker.publish("control.v2", "tx-1", "/cb");
    broker.publish("control", "tx-2", "/ignored");
    tokio::time::sleep(Duration::from_secs(4)).await;

    let subscriptions = broker.subscriptions();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].topic, "control.v2");
    assert_eq!(subscriptions[0].group.as_deref(), Some("monitors"));
    assert_eq!(callback.calls(), vec!["/cb".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_cleanly_and_drops_pending() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();

    let (shutdown, task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    broker.publish("control", "tx-1", "/pending");
    tokio::time::sleep(Duration::from_secs(1)).await;

    shutdown.cancel();
    task.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(callback.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_fires_pending_when_configured() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();
    let config = WatchdogConfig {
        shutdown_policy: ShutdownPolicy::FirePending,
        ..WatchdogConfig::default()
    };

    let (shutdown, task) = spawn_service(&broker, &callback, config);
    broker.publish("control", "tx-1", "/pending");
    tokio::time::sleep(Duration::from_secs(1)).await;

    shutdown.cancel();
    task.await.unwrap().unwrap();

    assert_eq!(callback.calls(), vec!["/pending".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn read_failure_fails_the_service() {
    let broker = TestBroker::new();
    let callback = TestCompletionCallback::new();

    broker.publish("control", "tx-1", "/pending");
    broker.fail("control", "connection reset");

    let (_shutdown, task) = spawn_service(&broker, &callback, WatchdogConfig::default());
    let err = task.await.unwrap().unwrap_err();

    assert!(format!("{:#}", err).contains("connection reset"));
    // The actor was stopped with the consumer, so the pending timer never fires
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(callback.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn host_reports_failed_watchdog() {
    let broker = TestBroker::new();
    broker.fail("control", "broker gone");

    let host = ServiceHost::new().with_service(WatchdogService::new(
        Arc::new(broker.clone()),
        Arc::new(TestCompletionCallback::new()),
        WatchdogConfig::default(),
    ));

    let err = host.run().await.unwrap_err();
    assert!(err.to_string().contains("watchdog"));
}
