//! Orchestrator module - drives the probe loop
//!
//! The orchestrator is the core coordinator that:
//! - Loads the monitored domains from the store
//! - Builds one query runner per domain
//! - Probes every domain on each tick and flushes every few ticks
//! - Flushes a last time and stops on termination
//!
//! Ticks and termination are consumed by a single loop, so a tick is never
//! processed while a previous one is still running.

pub mod signals;

#[cfg(test)]
mod tests;

pub use signals::Termination;

use std::future::Future;

use tracing::{debug, error, info};

use crate::database::PersistenceStore;
use crate::domain::Domain;
use crate::error::ProbeError;
use crate::monitoring::{QueryRunner, Schedule, Ticker};

/// Lifecycle of an [`Orchestrator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Domains and runners are in place; terminal when no domain was found
    Loaded,
    Running,
    Stopping,
    Stopped,
}

/// The vantage point: owns the store, the domains and their runners
pub struct Orchestrator<S, R> {
    store: S,
    schedule: Schedule,
    domains: Vec<Domain>,
    runners: Vec<R>,
    ticks: u32,
    state: State,
}

impl<S, R> Orchestrator<S, R>
where
    S: PersistenceStore,
    R: QueryRunner,
{
    pub fn new(store: S, schedule: Schedule) -> Self {
        Self {
            store,
            schedule,
            domains: Vec::new(),
            runners: Vec::new(),
            ticks: 0,
            state: State::Uninitialized,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Give the store back, typically to disconnect it
    pub fn into_store(self) -> S {
        self.store
    }

    /// Load the domains and probe them until `termination` completes.
    ///
    /// Returns immediately when the store holds no domain. A runner that
    /// cannot be built aborts the start.
    pub async fn start<F, T>(&mut self, build_runner: F, termination: T) -> Result<(), ProbeError>
    where
        F: FnMut(&Domain) -> Result<R, ProbeError>,
        T: Future<Output = ()>,
    {
        if self.load(build_runner).await? == 0 {
            info!("No domain to probe");
            return Ok(());
        }

        self.run(termination).await;
        Ok(())
    }

    pub(crate) async fn load<F>(&mut self, mut build_runner: F) -> Result<usize, ProbeError>
    where
        F: FnMut(&Domain) -> Result<R, ProbeError>,
    {
        let domains = self.store.load_domains().await?;
        let runners = domains.iter().map(&mut build_runner).collect::<Result<Vec<_>, _>>()?;

        info!("Found {} domains", domains.len());
        self.domains = domains;
        self.runners = runners;
        self.ticks = 0;
        self.state = State::Loaded;
        Ok(self.domains.len())
    }

    async fn run<T>(&mut self, termination: T)
    where
        T: Future<Output = ()>,
    {
        self.state = State::Running;
        info!(
            interval_ms = self.schedule.probe_interval.as_millis() as u64,
            flush_every = self.schedule.flush_every_n_ticks,
            "Probing started"
        );

        let mut ticker = Ticker::new(self.schedule.probe_interval);
        tokio::pin!(termination);

        self.probe_all().await;

        loop {
            tokio::select! {
                biased;
                () = &mut termination => break,
                () = ticker.tick() => self.on_tick().await,
            }
        }

        self.stop().await;
    }

    /// One firing of the periodic trigger
    pub(crate) async fn on_tick(&mut self) {
        self.ticks += 1;
        debug!(tick = self.ticks, "Tick");

        self.probe_all().await;

        if self.ticks >= self.schedule.flush_every_n_ticks {
            self.flush().await;
            self.ticks = 0;
        }
    }

    /// Query every domain once
    pub(crate) async fn probe_all(&mut self) {
        debug!("Probing all...");
        for (domain, runner) in self.domains.iter_mut().zip(&self.runners) {
            runner.probe(domain).await;
        }
    }

    async fn flush(&mut self) {
        let pending: usize = self.domains.iter().map(|d| d.pending_events().len()).sum();
        debug!(domains = self.domains.len(), pending, "Flushing");
        if let Err(e) = self.store.save_domains(&mut self.domains).await {
            error!("Failed to save domains: {}", e);
        }
    }

    async fn stop(&mut self) {
        self.state = State::Stopping;
        self.flush().await;
        self.state = State::Stopped;
        info!("Probing stopped");
    }
}
