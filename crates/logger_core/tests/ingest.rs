//! Cenários de ponta a ponta: router → pipeline → alerta → SQLite.

use logger_core::alerts::{AlertState, FridgeAlarm};
use logger_core::config::TopicConfig;
use logger_core::notifier::{Notifier, NotifyError};
use logger_core::router::{RouteError, WorkerStats};
use logger_core::store::{Database, PersistenceGateway, StoreError};
use logger_core::types::FridgeReading;
use logger_core::{Fridge, Mushroom, Outcome, Pipeline, Router, build_router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const FRIDGE: &str = "fridge/status";
const MUSHROOM: &str = "mushroom/status";

#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<(String, String)>>>);

impl Outbox {
    fn subjects(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl Notifier for Outbox {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push((subject.into(), body.into()));
        Ok(())
    }
}

/// Falha nas gravações ímpares.
struct FlakyStore {
    calls: AtomicUsize,
}

impl PersistenceGateway for FlakyStore {
    type Reading = FridgeReading;

    fn store(&self, _reading: &FridgeReading) -> Result<(), StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            Err(StoreError::Poisoned)
        } else {
            Ok(())
        }
    }
}

#[test]
fn scenario_a_zero_temperature_alerts_and_persists() {
    let db = Database::open_in_memory().unwrap();
    let outbox = Outbox::default();
    let mut router = build_router(&TopicConfig::default(), &db, outbox.clone());

    let out = router
        .dispatch(
            FRIDGE,
            br#"{"temperature":0.0,"humidity":5,"pressure":1,"compressor":false,"goal":4}"#,
        )
        .unwrap();

    assert_eq!(out, Outcome::Stored);
    assert_eq!(
        *outbox.0.lock().unwrap(),
        vec![(
            "Fridge is malfunctioning".to_string(),
            "Couldn't get sensor value.".to_string()
        )]
    );
    let stored = db.fridge_store().recent(1).unwrap();
    assert_eq!(
        stored[0].reading,
        FridgeReading {
            temperature: 0.0,
            humidity: 5.0,
            pressure: 1.0,
            compressor_on: false,
            goal_temperature: 4.0,
        }
    );
}

#[test]
fn scenario_b_recovery_after_alert() {
    let db = Database::open_in_memory().unwrap();
    let outbox = Outbox::default();
    let mut router = Router::new().route(
        FRIDGE,
        Pipeline::<Fridge, _>::new(db.fridge_store())
            .with_hook(FridgeAlarm::with_state(AlertState::Alerted, outbox.clone())),
    );

    let out = router
        .dispatch(
            FRIDGE,
            br#"{"temperature":21.5,"humidity":10,"pressure":1,"compressor":true,"goal":4}"#,
        )
        .unwrap();
    assert_eq!(out, Outcome::Stored);
    assert_eq!(outbox.subjects(), vec!["Fridge is working again"]);

    // Já em Normal: nenhuma notificação nova.
    router
        .dispatch(FRIDGE, br#"{"temperature":21.0,"humidity":10}"#)
        .unwrap();
    assert_eq!(outbox.subjects().len(), 1);
    assert_eq!(db.fridge_store().count().unwrap(), 2);
}

#[test]
fn scenario_c_out_of_range_is_dropped_without_alert() {
    let db = Database::open_in_memory().unwrap();
    let outbox = Outbox::default();
    let mut router = build_router(&TopicConfig::default(), &db, outbox.clone());

    let out = router
        .dispatch(
            FRIDGE,
            br#"{"temperature":150,"humidity":10,"pressure":1,"compressor":true,"goal":4}"#,
        )
        .unwrap();
    assert_eq!(out, Outcome::Rejected);
    assert!(outbox.subjects().is_empty());
    assert_eq!(db.fridge_store().count().unwrap(), 0);
}

#[test]
fn consecutive_failures_send_one_email() {
    let db = Database::open_in_memory().unwrap();
    let outbox = Outbox::default();
    let mut router = build_router(&TopicConfig::default(), &db, outbox.clone());

    for _ in 0..10 {
        router.dispatch(FRIDGE, br#"{"temperature":0,"humidity":5}"#).unwrap();
    }
    assert_eq!(outbox.subjects(), vec!["Fridge is malfunctioning"]);

    router.dispatch(FRIDGE, br#"{"temperature":3,"humidity":5}"#).unwrap();
    assert_eq!(
        outbox.subjects(),
        vec!["Fridge is malfunctioning", "Fridge is working again"]
    );
}

#[test]
fn mushroom_topic_never_alerts() {
    let db = Database::open_in_memory().unwrap();
    let outbox = Outbox::default();
    let mut router = build_router(&TopicConfig::default(), &db, outbox.clone());

    router.dispatch(MUSHROOM, br#"{"temperature":0,"humidity":0}"#).unwrap();
    router.dispatch(MUSHROOM, br#"{"temperature":999,"humidity":999}"#).unwrap();
    assert!(outbox.subjects().is_empty());
    assert_eq!(db.mushroom_store().count().unwrap(), 2);
}

#[test]
fn store_failure_is_isolated_per_message_and_topic() {
    let db = Database::open_in_memory().unwrap();
    let router = Router::new()
        .route(
            FRIDGE,
            Pipeline::<Fridge, _>::new(FlakyStore {
                calls: AtomicUsize::new(0),
            }),
        )
        .route(MUSHROOM, Pipeline::<Mushroom, _>::new(db.mushroom_store()));

    let workers = router.spawn_workers(32).unwrap();
    for _ in 0..4 {
        workers
            .deliver(FRIDGE, br#"{"temperature":4,"humidity":40}"#.to_vec())
            .unwrap();
        workers
            .deliver(MUSHROOM, br#"{"temperature":20,"humidity":80}"#.to_vec())
            .unwrap();
    }

    let stats = workers.shutdown();
    assert_eq!(
        stats,
        vec![
            WorkerStats {
                topic: FRIDGE.into(),
                stored: 2,
                rejected: 0,
                failed: 2,
            },
            WorkerStats {
                topic: MUSHROOM.into(),
                stored: 4,
                rejected: 0,
                failed: 0,
            },
        ]
    );
    assert_eq!(db.mushroom_store().count().unwrap(), 4);
}

#[test]
fn synchronous_dispatch_surfaces_store_failure() {
    let mut router = Router::new().route(
        FRIDGE,
        Pipeline::<Fridge, _>::new(FlakyStore {
            calls: AtomicUsize::new(0),
        }),
    );
    assert!(matches!(
        router.dispatch(FRIDGE, br#"{"temperature":4,"humidity":40}"#),
        Err(RouteError::Pipeline(_))
    ));
    assert_eq!(
        router
            .dispatch(FRIDGE, br#"{"temperature":4,"humidity":40}"#)
            .unwrap(),
        Outcome::Stored
    );
}
