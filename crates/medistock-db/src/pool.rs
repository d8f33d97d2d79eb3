//! # Database Pool Management
//!
//! Connection pool creation and the [`Database`] handle that hands out
//! repositories and inventory services.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  MediStockConfig ──► DbConfig ──► Database::new(config).await          │
//! │                                        │                                │
//! │                                        ▼                                │
//! │  ┌────────────────────────────────────────────────────────────┐        │
//! │  │ Database { pool, settings, invoices }                      │        │
//! │  │                                                            │        │
//! │  │  tenants()  products()  batches()  sales()   ← repositories│        │
//! │  │  allocation()  settlement()  alerts()  reports() ← services│        │
//! │  └────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  Handles are cheap: each clones the pool (an Arc) and settings.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## SQLite Settings
//! - WAL journal: readers never block the single writer
//! - busy_timeout: a second settlement waits for the write lock instead of
//!   failing immediately
//! - foreign keys on

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use medistock_core::invoice::InvoiceSequence;

use crate::config::{InventorySettings, MediStockConfig};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::batch::BatchRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::tenant::TenantRepository;
use crate::service::alerts::AlertProjector;
use crate::service::allocation::AllocationEngine;
use crate::service::reports::ReportService;
use crate::service::settlement::SettlementCoordinator;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/medistock.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// SQLite busy timeout for lock contention.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each connection to `:memory:` is its own database, so the pool is
    /// pinned to one connection. Concurrent callers queue on the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and service access.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./medistock.db")).await?;
/// let allocation = db.allocation().allocate(&ctx, &product_id, 5, AllocationMode::Auto, None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    settings: Arc<InventorySettings>,

    /// Shared by every settlement handle so numbers never repeat in-process.
    invoices: Arc<InvoiceSequence>,
}

impl Database {
    /// Creates a new database connection pool with default inventory settings.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL, NORMAL synchronous, foreign keys, busy timeout)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let settings = InventorySettings::default();
        let db = Database {
            pool,
            invoices: Arc::new(InvoiceSequence::new(settings.invoice_prefix.clone())),
            settings: Arc::new(settings),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Opens the database described by a loaded [`MediStockConfig`].
    pub async fn open(config: &MediStockConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(db.with_settings(config.inventory.clone()))
    }

    /// Replaces the inventory settings. Resets the invoice sequence to the
    /// new prefix.
    pub fn with_settings(mut self, settings: InventorySettings) -> Self {
        self.invoices = Arc::new(InvoiceSequence::new(settings.invoice_prefix.clone()));
        self.settings = Arc::new(settings);
        self
    }

    /// Replaces the invoice number source.
    pub fn with_invoice_sequence(mut self, sequence: InvoiceSequence) -> Self {
        self.invoices = Arc::new(sequence);
        self
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    /// Tenants and stores.
    pub fn tenants(&self) -> TenantRepository {
        TenantRepository::new(self.pool.clone())
    }

    /// Catalog store.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Batch ledger.
    pub fn batches(&self) -> BatchRepository {
        BatchRepository::new(self.pool.clone())
    }

    /// Sale history.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    pub fn allocation(&self) -> AllocationEngine {
        AllocationEngine::new(self.pool.clone(), self.settings.clone())
    }

    pub fn settlement(&self) -> SettlementCoordinator {
        SettlementCoordinator::new(
            self.pool.clone(),
            self.settings.clone(),
            self.invoices.clone(),
        )
    }

    pub fn alerts(&self) -> AlertProjector {
        AlertProjector::new(self.pool.clone(), self.settings.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_with_settings() {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_settings(InventorySettings {
                expiry_warning_days: 10,
                ..InventorySettings::default()
            });
        assert_eq!(db.settings().expiry_warning_days, 10);
    }
}
