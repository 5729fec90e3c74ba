//! # crew-db
//!
//! PostgreSQL record store for crewdispatch.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for workers, admins, jobs, and statistics
//! - Compare-and-set job lifecycle writes (the claim-exclusivity guarantee)
//!
//! ## Example
//!
//! ```rust,ignore
//! use crew_db::Database;
//! use crew_core::{JobRepository, SubmitJobRequest, Level};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/crewdispatch").await?;
//!
//!     let job = db.jobs.insert(&SubmitJobRequest {
//!         task: "inspect boiler".to_string(),
//!         payload: serde_json::json!({"building": "B2"}),
//!         department: "maintenance".to_string(),
//!         required_level: Level::Medior,
//!     }).await?;
//!
//!     println!("Queued job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod admins;
pub mod jobs;
pub mod pool;
pub mod workers;

// Test fixtures for integration tests.
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL.
pub mod test_fixtures;

pub use admins::PgAdminRepository;
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use workers::PgWorkerRepository;

// Re-export core types
pub use crew_core::*;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Worker repository (includes the statistics leaderboard).
    pub workers: PgWorkerRepository,
    /// Admin repository.
    pub admins: PgAdminRepository,
    /// Job repository with compare-and-set lifecycle writes.
    pub jobs: PgJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            workers: PgWorkerRepository::new(pool.clone()),
            admins: PgAdminRepository::new(pool.clone()),
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending schema migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Config(format!("migration failed: {}", e)))?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
