//! Generation cycle against a broker over real HTTP

mod common;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use common::{monza, provider_for, spawn_mock_broker};
use lapreplay::providers::MemoryProvider;
use lapreplay::sink::DEFAULT_PUBLISH_TIMEOUT;
use lapreplay::{
    CacheState, CycleOutcome, CycleScheduler, EntityContext, GenerationCycle, OrionSink,
    SimulationClock, Sink, SinkError, SinkStatus,
};

fn cycle_for(base_url: &str, provider: Arc<MemoryProvider>) -> GenerationCycle {
    let sink: Arc<dyn Sink> = Arc::new(OrionSink::new(base_url, DEFAULT_PUBLISH_TIMEOUT).unwrap());
    GenerationCycle::new(provider, sink, monza(), "LEC", EntityContext::new(12345))
}

#[tokio::test]
async fn publishes_batch_update() {
    let broker = spawn_mock_broker(200).await;
    let cycle = cycle_for(&broker.base_url, Arc::new(provider_for("LEC")));
    let mut cache = CacheState::new();

    let outcome = cycle.run(&mut cache, 42.4, Utc::now()).await;
    assert!(outcome.is_published(), "unexpected outcome {outcome:?}");

    let updates = broker.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["actionType"], "APPEND");
    let entity = &updates[0]["entities"][0];
    assert_eq!(entity["id"], "urn:ngsi-v2:Car:LEC:12345");
    assert_eq!(entity["type"], "Car");
    assert_eq!(entity["lapNumber"]["value"], 1);
    assert_eq!(entity["speed"]["value"], 242.0);
    assert_eq!(entity["x"]["value"], 420.0);
    assert_eq!(entity["drs"]["value"], true);
    assert_eq!(entity["sourceSession"]["value"]["gp"], "Italian Grand Prix");

    broker.stop().await;
}

#[tokio::test]
async fn rejected_publish_is_reported_and_next_tick_still_runs() {
    let broker = spawn_mock_broker(503).await;
    let provider = Arc::new(provider_for("LEC"));
    let cycle = cycle_for(&broker.base_url, Arc::clone(&provider));
    let mut cache = CacheState::new();

    let outcome = cycle.run(&mut cache, 10.0, Utc::now()).await;
    assert!(matches!(
        outcome,
        CycleOutcome::PublishFailed(SinkError::Rejected { status: 503, .. })
    ));

    broker.respond_with(200);
    let outcome = cycle.run(&mut cache, 20.0, Utc::now()).await;
    assert!(outcome.is_published());

    assert_eq!(broker.updates().await.len(), 2);
    assert_eq!(provider.lap_loads(), 1);
    broker.stop().await;
}

#[tokio::test]
async fn unreachable_broker_does_not_stop_the_scheduler() {
    let broker = spawn_mock_broker(200).await;
    let base_url = broker.base_url.clone();
    broker.stop().await;

    let cycle = cycle_for(&base_url, Arc::new(provider_for("LEC")));
    let mut cache = CacheState::new();
    let outcome = cycle.run(&mut cache, 10.0, Utc::now()).await;
    assert!(matches!(outcome, CycleOutcome::PublishFailed(SinkError::Unreachable { .. })));
    assert!(!cache.is_empty());

    let sink = OrionSink::new(&base_url, DEFAULT_PUBLISH_TIMEOUT).unwrap();
    assert_eq!(sink.probe().await, SinkStatus::Unreachable);
}

#[tokio::test]
async fn probe_reports_broker_status() {
    let broker = spawn_mock_broker(200).await;
    let sink = OrionSink::new(&broker.base_url, DEFAULT_PUBLISH_TIMEOUT).unwrap();
    assert_eq!(sink.probe().await, SinkStatus::Ok);

    broker.respond_with(503);
    assert_eq!(sink.probe().await, SinkStatus::Error(503));
    broker.stop().await;
}

#[tokio::test]
async fn scheduler_publishes_on_first_tick() {
    let broker = spawn_mock_broker(200).await;
    let cycle = cycle_for(&broker.base_url, Arc::new(provider_for("LEC")));
    let handle = CycleScheduler::spawn(cycle, SimulationClock::start(), Duration::from_secs(3600));

    for _ in 0..50 {
        if handle.stats().published() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(handle.stats().published(), 1);
    assert!(handle.has_dataset());
    assert_eq!(broker.updates().await[0]["entities"][0]["lapNumber"]["value"], 1);

    handle.shutdown().await;
    assert!(!handle.is_running());
    broker.stop().await;
}
