//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crew_core::{new_v7, Error, Job, JobRepository, JobStatus, Level, Result, SubmitJobRequest};

/// Columns returned for every job query, with enum columns cast to text.
const JOB_COLUMNS: &str = "id, task, payload, department, required_level::text, status::text,
                           assigned_to, expected_completion, created_at";

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert string from database to Level.
    fn str_to_level(s: &str) -> Level {
        match s {
            "junior" => Level::Junior,
            "medior" => Level::Medior,
            "senior" => Level::Senior,
            _ => Level::Junior, // fallback
        }
    }

    /// Convert string from database to JobStatus.
    fn str_to_status(s: &str) -> JobStatus {
        match s {
            "queued" => JobStatus::Queued,
            "in_progress" => JobStatus::InProgress,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Queued, // fallback
        }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Job {
        Job {
            id: row.get("id"),
            task: row.get("task"),
            payload: row.get("payload"),
            department: row.get("department"),
            required_level: Self::str_to_level(row.get("required_level")),
            status: Self::str_to_status(row.get("status")),
            assigned_to: row.get("assigned_to"),
            expected_completion: row.get("expected_completion"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, req: &SubmitJobRequest) -> Result<Job> {
        let job_id = new_v7();
        let now = Utc::now();

        let row = sqlx::query(&format!(
            "INSERT INTO job (id, task, payload, department, required_level, status, created_at)
             VALUES ($1, $2, $3, $4, $5::skill_level, 'queued'::job_status, $6)
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job_id)
        .bind(&req.task)
        .bind(&req.payload)
        .bind(&req.department)
        .bind(req.required_level.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_job_row(row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM job WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn list_queued(&self, department: &str, max_level: Level) -> Result<Vec<Job>> {
        // Insertion order; id (v7, time-ordered) breaks created_at ties.
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job
             WHERE department = $1
               AND status = 'queued'::job_status
               AND required_level <= $2::skill_level
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(department)
        .bind(max_level.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }

    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        expected_completion: DateTime<Utc>,
    ) -> Result<Option<Job>> {
        // Compare-and-set: the status predicate is part of the UPDATE, so of
        // two racing claimants exactly one matches the row and the other
        // gets no row back.
        let row = sqlx::query(&format!(
            "UPDATE job
             SET status = 'in_progress'::job_status, assigned_to = $2, expected_completion = $3
             WHERE id = $1 AND status = 'queued'::job_status
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job_id)
        .bind(worker_id)
        .bind(expected_completion)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn unclaim(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE job
             SET status = 'queued'::job_status, assigned_to = NULL, expected_completion = NULL
             WHERE id = $1 AND status = 'in_progress'::job_status AND assigned_to = $2
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn complete(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // assigned_to stays set on the completed row so history queries can
        // attribute the job.
        let row = sqlx::query(&format!(
            "UPDATE job
             SET status = 'completed'::job_status
             WHERE id = $1 AND status = 'in_progress'::job_status AND assigned_to = $2
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            // CAS miss: drop the transaction without committing.
            return Ok(None);
        };

        sqlx::query("UPDATE statistics SET completed_jobs = completed_jobs + 1 WHERE worker_id = $1")
            .bind(worker_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(Some(Self::parse_job_row(row)))
    }

    async fn completed_for_worker(&self, worker_id: Uuid) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job
             WHERE assigned_to = $1 AND status = 'completed'::job_status
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_level_all_variants() {
        assert_eq!(PgJobRepository::str_to_level("junior"), Level::Junior);
        assert_eq!(PgJobRepository::str_to_level("medior"), Level::Medior);
        assert_eq!(PgJobRepository::str_to_level("senior"), Level::Senior);
    }

    #[test]
    fn test_str_to_level_unknown_fallback() {
        assert_eq!(PgJobRepository::str_to_level("expert"), Level::Junior);
        assert_eq!(PgJobRepository::str_to_level(""), Level::Junior);
    }

    #[test]
    fn test_str_to_status_all_variants() {
        assert_eq!(PgJobRepository::str_to_status("queued"), JobStatus::Queued);
        assert_eq!(
            PgJobRepository::str_to_status("in_progress"),
            JobStatus::InProgress
        );
        assert_eq!(
            PgJobRepository::str_to_status("completed"),
            JobStatus::Completed
        );
    }

    #[test]
    fn test_str_to_status_unknown_fallback() {
        assert_eq!(PgJobRepository::str_to_status("running"), JobStatus::Queued);
        assert_eq!(PgJobRepository::str_to_status(""), JobStatus::Queued);
    }

    #[test]
    fn test_level_round_trip() {
        for level in Level::ALL {
            assert_eq!(PgJobRepository::str_to_level(level.as_str()), level);
        }
    }
}
