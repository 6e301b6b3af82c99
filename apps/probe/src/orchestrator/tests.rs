//! Tests for the probe loop
//!
//! These tests verify:
//! - Periodic flushing and event draining
//! - Graceful shutdown with a final flush
//! - Failure handling of runners and the store

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{Orchestrator, State};
use crate::database::models::DomainRecord;
use crate::database::{PersistenceStore, StoreError};
use crate::domain::{Domain, Event, EventKind};
use crate::error::ProbeError;
use crate::monitoring::{QueryRunner, Reply, Schedule};

#[derive(Default)]
struct MemoryState {
    domains: Vec<DomainRecord>,
    measurements: Vec<(String, Event)>,
    saves: usize,
    fail_saves: bool,
}

/// In-memory store; clones share the same contents
#[derive(Clone, Default)]
struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    fn with_domains(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (i, name) in names.iter().enumerate() {
                let mut record = DomainRecord::from_domain(&Domain::new(*name));
                record.rank = Some(i as i64 + 1);
                state.domains.push(record);
            }
        }
        store
    }

    fn saves(&self) -> usize {
        self.state.lock().unwrap().saves
    }

    fn measurements(&self) -> Vec<(String, Event)> {
        self.state.lock().unwrap().measurements.clone()
    }

    fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().fail_saves = failing;
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn load_domains(&self) -> Result<Vec<Domain>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.domains.iter().cloned().map(DomainRecord::into_domain).collect())
    }

    async fn add_domains(&self, domains: &[Domain]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for domain in domains {
            let mut record = DomainRecord::from_domain(domain);
            record.rank = Some(state.domains.len() as i64 + 1);
            state.domains.push(record);
        }
        Ok(())
    }

    async fn delete_domains(&self, domains: &[Domain]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.domains.retain(|record| !domains.iter().any(|d| d.name() == record.name));
        Ok(())
    }

    async fn save_domains(&self, domains: &mut [Domain]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.saves += 1;

        let batches: Vec<(String, Vec<Event>)> =
            domains.iter_mut().map(|d| (d.name().to_string(), d.drain_events())).collect();

        if state.fail_saves {
            return Err(StoreError::Pool("injected failure".into()));
        }

        for domain in domains.iter() {
            let record = DomainRecord::from_domain(domain);
            if let Some(stored) = state.domains.iter_mut().find(|r| r.rank == record.rank) {
                *stored = record;
            }
        }
        for (name, batch) in batches {
            state.measurements.extend(batch.into_iter().map(|event| (name.clone(), event)));
        }
        Ok(())
    }

    async fn disconnect(&self) {}
}

#[derive(Default)]
struct Script {
    queries: usize,
    /// Fired from inside the query with this 1-based index
    trigger_at: Option<(usize, oneshot::Sender<()>)>,
}

/// Runner answering every query with a fixed kind and duration
struct ScriptedRunner {
    kind: EventKind,
    duration: f64,
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    fn replying(script: &Arc<Mutex<Script>>, duration: f64) -> Self {
        Self { kind: EventKind::RecvReply, duration, script: Arc::clone(script) }
    }

    fn failing(script: &Arc<Mutex<Script>>, kind: EventKind) -> Self {
        Self { kind, duration: 5000.0, script: Arc::clone(script) }
    }
}

#[async_trait]
impl QueryRunner for ScriptedRunner {
    async fn send_query(&self, domain: &mut Domain) -> (Reply, bool) {
        let fire = {
            let mut script = self.script.lock().unwrap();
            script.queries += 1;
            let due = matches!(script.trigger_at, Some((at, _)) if at == script.queries);
            if due { script.trigger_at.take().map(|(_, tx)| tx) } else { None }
        };

        if let Some(tx) = fire {
            let _ = tx.send(());
            // Termination is now pending while this query is still in flight
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let reply = Reply::new(format!("{}.{}.", domain.random_target(), domain.name()));
        match self.kind {
            EventKind::RecvReply => (reply.received(self.duration), true),
            EventKind::Timeout => (reply.timed_out(self.duration), false),
            _ => (reply.failed(self.duration), false),
        }
    }
}

fn total_pending(orchestrator: &Orchestrator<MemoryStore, ScriptedRunner>) -> usize {
    orchestrator.domains().iter().map(|d| d.pending_events().len()).sum()
}

#[tokio::test]
async fn test_empty_store_is_a_no_op() {
    let store = MemoryStore::default();
    let script = Arc::new(Mutex::new(Script::default()));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(10), 4));

    orchestrator
        .start(|_| Ok(ScriptedRunner::replying(&script, 1.0)), std::future::pending())
        .await
        .unwrap();

    assert_eq!(orchestrator.state(), State::Loaded);
    assert_eq!(store.saves(), 0);
    assert_eq!(script.lock().unwrap().queries, 0);
}

#[tokio::test]
async fn test_runner_construction_failure_aborts_start() {
    let store = MemoryStore::with_domains(&["example.test"]);
    let mut orchestrator: Orchestrator<MemoryStore, ScriptedRunner> =
        Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(10), 4));

    let result = orchestrator
        .start(|_| Err(ProbeError::Resolver("no nameservers".into())), std::future::pending())
        .await;

    assert!(matches!(result, Err(ProbeError::Resolver(_))));
    assert_eq!(orchestrator.state(), State::Uninitialized);
    assert_eq!(store.saves(), 0);
}

#[tokio::test]
async fn test_flush_every_n_ticks() {
    let store = MemoryStore::with_domains(&["a.test", "b.test"]);
    let script = Arc::new(Mutex::new(Script::default()));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(10), 4));
    orchestrator.load(|_| Ok(ScriptedRunner::replying(&script, 2.0))).await.unwrap();

    let mut previous = 0;
    for _ in 0..3 {
        orchestrator.on_tick().await;
        let pending = total_pending(&orchestrator);
        assert!(pending > previous);
        previous = pending;
    }
    assert_eq!(store.saves(), 0);
    assert_eq!(previous, 6);

    orchestrator.on_tick().await;
    assert_eq!(store.saves(), 1);
    assert_eq!(total_pending(&orchestrator), 0);
    assert_eq!(store.measurements().len(), 8);

    for _ in 0..4 {
        orchestrator.on_tick().await;
    }
    assert_eq!(store.saves(), 2);
    assert_eq!(total_pending(&orchestrator), 0);
    assert_eq!(store.measurements().len(), 16);
}

#[tokio::test(start_paused = true)]
async fn test_timed_run_flushes_periodically_and_on_stop() {
    let store = MemoryStore::with_domains(&["a.test", "b.test"]);
    let script = Arc::new(Mutex::new(Script::default()));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(100), 4));

    // Ticks at 100..=800 ms, termination in between the eighth and ninth
    let termination = tokio::time::sleep(Duration::from_millis(850));
    orchestrator
        .start(|_| Ok(ScriptedRunner::replying(&script, 4.0)), termination)
        .await
        .unwrap();

    assert_eq!(orchestrator.state(), State::Stopped);
    assert_eq!(store.saves(), 3);
    assert_eq!(total_pending(&orchestrator), 0);

    // One immediate pass plus eight ticks for each domain
    assert_eq!(store.measurements().len(), 18);
    for domain in orchestrator.domains() {
        assert_eq!(domain.query_count(), 9);
        assert!((domain.query_time_avg() - 4.0).abs() < 1e-9);
    }

    let store = orchestrator.into_store();
    let persisted = store.load_domains().await.unwrap();
    assert!(persisted.iter().all(|d| d.query_count() == 9));
}

#[tokio::test(start_paused = true)]
async fn test_termination_mid_probe_is_flushed() {
    let store = MemoryStore::with_domains(&["example.test"]);
    let (tx, rx) = oneshot::channel();
    let script = Arc::new(Mutex::new(Script { queries: 0, trigger_at: Some((3, tx)) }));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(100), 10));

    orchestrator
        .start(
            |_| Ok(ScriptedRunner::replying(&script, 1.0)),
            async {
                let _ = rx.await;
            },
        )
        .await
        .unwrap();

    assert_eq!(orchestrator.state(), State::Stopped);
    assert_eq!(script.lock().unwrap().queries, 3);
    assert_eq!(store.saves(), 1);

    let measurements = store.measurements();
    assert_eq!(measurements.len(), 3);
    assert!(measurements.iter().all(|(name, event)| name == "example.test" && event.kind == EventKind::RecvReply));
}

#[tokio::test]
async fn test_failed_probes_are_recorded_without_stats() {
    let store = MemoryStore::with_domains(&["slow.test", "broken.test"]);
    let script = Arc::new(Mutex::new(Script::default()));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(10), 1));

    let mut kinds = vec![EventKind::Timeout, EventKind::Error].into_iter();
    orchestrator
        .load(|_| Ok(ScriptedRunner::failing(&script, kinds.next().unwrap())))
        .await
        .unwrap();

    orchestrator.probe_all().await;

    let domains = orchestrator.domains();
    assert!(domains.iter().all(|d| d.query_count() == 0 && d.time_first().is_none()));
    assert_eq!(domains[0].pending_events().next().map(|e| e.kind), Some(EventKind::Timeout));
    assert_eq!(domains[1].pending_events().next().map(|e| e.kind), Some(EventKind::Error));
}

#[tokio::test]
async fn test_failed_flush_discards_batch_and_continues() {
    let store = MemoryStore::with_domains(&["example.test"]);
    let script = Arc::new(Mutex::new(Script::default()));
    let mut orchestrator = Orchestrator::new(store.clone(), Schedule::new(Duration::from_millis(10), 1));
    orchestrator.load(|_| Ok(ScriptedRunner::replying(&script, 3.0))).await.unwrap();

    store.set_failing(true);
    orchestrator.on_tick().await;
    assert_eq!(store.saves(), 1);
    assert_eq!(total_pending(&orchestrator), 0);
    assert!(store.measurements().is_empty());

    store.set_failing(false);
    orchestrator.on_tick().await;
    assert_eq!(store.saves(), 2);
    assert_eq!(store.measurements().len(), 1);
    assert_eq!(orchestrator.domains()[0].query_count(), 2);
}
