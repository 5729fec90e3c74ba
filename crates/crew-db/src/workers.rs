//! Worker repository implementation.
//!
//! Registration inserts the worker and its zeroed statistics row in one
//! transaction, so the 1:1 pair is never orphaned.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crew_core::{
    new_v7, Error, Level, RegisterWorkerRequest, Result, Worker, WorkerRepository, WorkerStanding,
};

const WORKER_COLUMNS: &str =
    "id, name, surname, department, level::text, email, password_hash, created_at";

/// PostgreSQL implementation of WorkerRepository.
#[derive(Clone)]
pub struct PgWorkerRepository {
    pool: Pool<Postgres>,
}

impl PgWorkerRepository {
    /// Create a new PgWorkerRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_worker_row(row: sqlx::postgres::PgRow) -> Worker {
        Worker {
            id: row.get("id"),
            name: row.get("name"),
            surname: row.get("surname"),
            department: row.get("department"),
            level: parse_level(row.get("level")),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        }
    }
}

/// Convert string from database to Level.
pub(crate) fn parse_level(s: &str) -> Level {
    match s {
        "junior" => Level::Junior,
        "medior" => Level::Medior,
        "senior" => Level::Senior,
        _ => Level::Junior, // fallback
    }
}

/// Map a unique-violation insert error to `Conflict`.
pub(crate) fn map_insert_error(e: sqlx::Error, what: &str) -> Error {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("{} already registered", what));
        }
    }
    Error::Database(e)
}

#[async_trait]
impl WorkerRepository for PgWorkerRepository {
    async fn insert(&self, req: &RegisterWorkerRequest, password_hash: &str) -> Result<Worker> {
        let worker_id = new_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "INSERT INTO worker (id, name, surname, department, level, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5::skill_level, $6, $7, $8)
             RETURNING {WORKER_COLUMNS}"
        ))
        .bind(worker_id)
        .bind(&req.name)
        .bind(&req.surname)
        .bind(&req.department)
        .bind(req.level.as_str())
        .bind(&req.email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "email"))?;

        sqlx::query("INSERT INTO statistics (worker_id, completed_jobs) VALUES ($1, 0)")
            .bind(worker_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(Self::parse_worker_row(row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Worker>> {
        let row = sqlx::query(&format!("SELECT {WORKER_COLUMNS} FROM worker WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_worker_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Worker>> {
        let row = sqlx::query(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_worker_row))
    }

    async fn eligible_for(&self, department: &str, required_level: Level) -> Result<Vec<Worker>> {
        // skill_level enum order follows its declaration: junior < medior < senior.
        let rows = sqlx::query(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker
             WHERE department = $1 AND level >= $2::skill_level
             ORDER BY id ASC"
        ))
        .bind(department)
        .bind(required_level.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_worker_row).collect())
    }

    async fn set_level(&self, id: Uuid, level: Level) -> Result<Option<Worker>> {
        let row = sqlx::query(&format!(
            "UPDATE worker SET level = $2::skill_level WHERE id = $1
             RETURNING {WORKER_COLUMNS}"
        ))
        .bind(id)
        .bind(level.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_worker_row))
    }

    async fn standings(&self) -> Result<Vec<WorkerStanding>> {
        // Ties break by worker id ASC; v7 ids order by registration time.
        let rows = sqlx::query(
            "SELECT w.id, w.name, w.surname, w.level::text, s.completed_jobs
             FROM worker w
             JOIN statistics s ON s.worker_id = w.id
             ORDER BY s.completed_jobs DESC, w.id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| WorkerStanding {
                worker_id: row.get("id"),
                name: row.get("name"),
                surname: row.get("surname"),
                level: parse_level(row.get("level")),
                completed_jobs: row.get("completed_jobs"),
            })
            .collect())
    }
}
