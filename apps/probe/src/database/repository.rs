use std::path::PathBuf;

use async_trait::async_trait;
use libsql::{Connection, params};
use tracing::{debug, info, warn};

use super::StoreError;
use super::migrations::run_migrations;
use super::models::{DomainRecord, MeasurementRecord};
use crate::config::DatabaseSettings;
use crate::domain::{Domain, Event};
use crate::pool::{LibsqlManager, LibsqlPool};

const POOL_SIZE: usize = 2;

/// Durable storage for domains and their measurements
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Every stored domain with its rank and aggregates
    async fn load_domains(&self) -> Result<Vec<Domain>, StoreError>;

    /// Insert new rows; ranks are assigned by the store
    async fn add_domains(&self, domains: &[Domain]) -> Result<(), StoreError>;

    /// Remove the rows whose names match, measurements included
    async fn delete_domains(&self, domains: &[Domain]) -> Result<(), StoreError>;

    /// Write current aggregates, then drain every event queue into
    /// measurement rows.
    ///
    /// Events are taken from the domains before anything is written, so a
    /// failed save loses them. Events of a domain whose row is gone are
    /// dropped while the others are still written.
    async fn save_domains(&self, domains: &mut [Domain]) -> Result<(), StoreError>;

    async fn disconnect(&self);
}

/// Where a database name points to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    fn parse(name: &str) -> Self {
        if ["libsql://", "http://", "https://"].iter().any(|scheme| name.starts_with(scheme)) {
            return Location::Remote(name.to_string());
        }

        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension("db");
        }
        Location::Local(path)
    }
}

/// LibSQL store (local SQLite file or remote libsql server)
pub struct LibsqlStore {
    pool: LibsqlPool,
    name: String,
}

impl LibsqlStore {
    /// Open the database, build the pool and bring the schema up to date
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        if settings.name.trim().is_empty() {
            return Err(StoreError::Connect("database name is empty".into()));
        }

        let database = match Location::parse(&settings.name) {
            Location::Local(path) => {
                debug!(path = %path.display(), "Opening local database");
                libsql::Builder::new_local(path).build().await
            }
            Location::Remote(url) => {
                debug!(%url, user = %settings.user, "Opening remote database");
                libsql::Builder::new_remote(url, settings.password.clone()).build().await
            }
        }
        .map_err(|e| StoreError::Connect(format!("{}: {e}", settings.name)))?;

        let pool = deadpool::managed::Pool::builder(LibsqlManager::new(database))
            .max_size(POOL_SIZE)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        let store = Self { pool, name: settings.name.clone() };
        {
            let conn = store.get_conn().await?;
            run_migrations(&conn).await?;
        }

        info!("Connected to {} as {}", settings.name, settings.user);
        Ok(store)
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }

    async fn write_batch(
        conn: &Connection,
        domains: &[Domain],
        batches: Vec<Vec<Event>>,
    ) -> Result<(Vec<(usize, i64)>, usize), StoreError> {
        let mut assigned = Vec::new();
        let mut ranks = Vec::with_capacity(domains.len());

        for (index, domain) in domains.iter().enumerate() {
            let record = DomainRecord::from_domain(domain);
            let rank = match record.rank {
                Some(rank) => {
                    debug!(domain = %record.name, rank, "Updating domain");
                    let updated = conn
                        .execute(
                            "UPDATE domain SET name = ?, query_time_avg = ?, query_time_stddev = ?, query_count = ?, time_first = ?, time_last = ? WHERE rank = ?",
                            params![
                                record.name.clone(),
                                record.query_time_avg,
                                record.query_time_stddev,
                                record.query_count,
                                record.time_first,
                                record.time_last,
                                rank
                            ],
                        )
                        .await?;
                    // Row removed by another process since it was loaded
                    (updated > 0).then_some(rank)
                }
                None => {
                    let rank = insert_domain(conn, &record).await?;
                    assigned.push((index, rank));
                    Some(rank)
                }
            };
            ranks.push(rank);
        }

        let mut inserted = 0;
        for ((domain, rank), batch) in domains.iter().zip(ranks).zip(batches) {
            let Some(rank) = rank else {
                warn!(domain = %domain.name(), dropped = batch.len(), "Domain no longer in database, dropping its measurements");
                continue;
            };

            for event in batch {
                let measurement = MeasurementRecord::from_event(event, rank);
                conn.execute(
                    "INSERT INTO measurement (time, target, type, duration_ms, domain_rank) VALUES (?, ?, ?, ?, ?)",
                    params![
                        measurement.time,
                        measurement.target,
                        measurement.kind,
                        measurement.duration_ms,
                        measurement.domain_rank
                    ],
                )
                .await?;
                inserted += 1;
            }
        }

        Ok((assigned, inserted))
    }
}

async fn insert_domain(conn: &Connection, record: &DomainRecord) -> Result<i64, StoreError> {
    debug!(domain = %record.name, "Inserting domain");
    conn.execute(
        "INSERT INTO domain (name, query_time_avg, query_time_stddev, query_count, time_first, time_last) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            record.name.clone(),
            record.query_time_avg,
            record.query_time_stddev,
            record.query_count,
            record.time_first,
            record.time_last
        ],
    )
    .await?;

    Ok(conn.last_insert_rowid())
}

#[async_trait]
impl PersistenceStore for LibsqlStore {
    async fn load_domains(&self) -> Result<Vec<Domain>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT rank, name, query_time_avg, query_time_stddev, query_count, time_first, time_last FROM domain ORDER BY rank",
                (),
            )
            .await?;

        let mut domains = Vec::new();
        while let Some(row) = rows.next().await? {
            let record = DomainRecord {
                rank: Some(row.get(0)?),
                name: row.get(1)?,
                query_time_avg: row.get(2)?,
                query_time_stddev: row.get(3)?,
                query_count: row.get(4)?,
                time_first: row.get(5)?,
                time_last: row.get(6)?,
            };
            domains.push(record.into_domain());
        }

        debug!(count = domains.len(), "Loaded domains");
        Ok(domains)
    }

    async fn add_domains(&self, domains: &[Domain]) -> Result<(), StoreError> {
        if domains.is_empty() {
            return Ok(());
        }

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;
        for domain in domains {
            let rank = insert_domain(&tx, &DomainRecord::from_domain(domain)).await?;
            info!(domain = %domain.name(), rank, "Domain added");
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_domains(&self, domains: &[Domain]) -> Result<(), StoreError> {
        if domains.is_empty() {
            return Ok(());
        }

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;
        for domain in domains {
            let removed = tx.execute("DELETE FROM domain WHERE name = ?", params![domain.name()]).await?;
            if removed == 0 {
                warn!(domain = %domain.name(), "Domain not in database");
            } else {
                info!(domain = %domain.name(), "Domain deleted");
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn save_domains(&self, domains: &mut [Domain]) -> Result<(), StoreError> {
        if domains.is_empty() {
            return Ok(());
        }

        let batches: Vec<Vec<Event>> = domains.iter_mut().map(Domain::drain_events).collect();
        let pending: usize = batches.iter().map(Vec::len).sum();

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        match Self::write_batch(&tx, domains, batches).await {
            Ok((assigned, inserted)) => {
                tx.commit().await?;
                for (index, rank) in assigned {
                    domains[index].set_rank(rank);
                }
                debug!(domains = domains.len(), measurements = inserted, "Saved domains");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                warn!(dropped = pending, "Discarding measurements of failed save");
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        self.pool.close();
        info!("Disconnected from {}", self.name);
    }
}
