use libsql::Connection;

use super::StoreError;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 2;

/// Run database migrations
///
/// Brings the `domain` and `measurement` tables up to [`SCHEMA_VERSION`].
/// Safe to call on every start.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    // Create schema_migrations table first (tracks applied migrations)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::debug!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Domain and measurement tables").await?;
    }

    if current_version < 2 {
        run_migration_v2(conn).await?;
        record_migration(conn, 2, "Index measurements by time").await?;
    }

    tracing::info!("Database migrations completed successfully (now at version {})", SCHEMA_VERSION);
    Ok(())
}

/// Get current schema version from database
pub(crate) async fn get_current_version(conn: &Connection) -> Result<i32, StoreError> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<(), StoreError> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: domains and their measurement history
async fn run_migration_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS domain (
            rank INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            query_time_avg REAL NOT NULL DEFAULT 0,
            query_time_stddev REAL NOT NULL DEFAULT 0,
            query_count INTEGER NOT NULL DEFAULT 0,
            time_first INTEGER,
            time_last INTEGER
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS measurement (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            time INTEGER NOT NULL,
            target TEXT NOT NULL,
            type INTEGER NOT NULL,
            duration_ms REAL NOT NULL,
            domain_rank INTEGER NOT NULL,
            FOREIGN KEY (domain_rank) REFERENCES domain(rank) ON DELETE CASCADE ON UPDATE CASCADE
        )",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_domain_name ON domain(name)", ()).await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_measurement_domain_rank ON measurement(domain_rank)", ()).await?;

    Ok(())
}

/// Migration v2: time-ordered scans for failure-rate analysis
async fn run_migration_v2(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_measurement_domain_time ON measurement(domain_rank, time DESC)",
        (),
    )
    .await?;

    Ok(())
}
