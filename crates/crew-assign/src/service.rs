//! The assignment service: orchestrates job creation, eligible-worker
//! discovery, lifecycle transitions, and statistics, and hands lifecycle
//! events to the notification dispatcher.
//!
//! Guards run twice by design: once here against a fresh read (so callers
//! get the precise error — NotFound, Forbidden, or Conflict), and once more
//! inside the record store's compare-and-set write (so a transition that
//! raced another caller between read and write still fails closed). A CAS
//! miss after a passing guard means the job state moved underneath us, which
//! is reported as `Conflict`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crew_core::{
    eligibility, lifecycle, Admin, Error, Job, JobRepository, Level, Result, SubmitJobRequest,
    Worker, WorkerRepository, WorkerStanding,
};
use crew_notify::NotifyHandle;

/// Orchestrates assignment operations over an injected record store and
/// notification hand-off. Holds no state of its own.
pub struct AssignmentService {
    workers: Arc<dyn WorkerRepository>,
    jobs: Arc<dyn JobRepository>,
    notify: NotifyHandle,
    /// Fixed recipient for completion notifications.
    oversight_email: String,
}

impl AssignmentService {
    pub fn new(
        workers: Arc<dyn WorkerRepository>,
        jobs: Arc<dyn JobRepository>,
        notify: NotifyHandle,
        oversight_email: String,
    ) -> Self {
        Self {
            workers,
            jobs,
            notify,
            oversight_email,
        }
    }

    /// Create a queued job and notify every eligible worker.
    ///
    /// The job is persisted before any notification is enqueued, and the
    /// hand-off is fire-and-forget: delivery failure never fails submission.
    pub async fn submit_job(&self, req: SubmitJobRequest) -> Result<Job> {
        let job = self.jobs.insert(&req).await?;

        // The store pre-filters server-side; the matcher predicate is still
        // the authority on who gets notified.
        let candidates = self
            .workers
            .eligible_for(&job.department, job.required_level)
            .await?;
        let eligible = eligibility::eligible_workers_for(&job, &candidates);

        info!(
            subsystem = "assign",
            op = "submit_job",
            job_id = %job.id,
            department = %job.department,
            level = %job.required_level,
            result_count = eligible.len(),
            "Job queued, notifying eligible workers"
        );

        let subject = format!("New job: {}", job.task);
        let body = format!("Description: {}", job.payload);
        for worker in &eligible {
            self.notify.send(&worker.email, &subject, &body);
        }

        Ok(job)
    }

    /// Queued jobs the worker may claim: same department, required level at
    /// or below the worker's own, insertion order. Empty is not an error.
    pub async fn list_available_jobs(&self, worker: &Worker) -> Result<Vec<Job>> {
        let jobs = self
            .jobs
            .list_queued(&worker.department, worker.level)
            .await?;
        debug!(
            subsystem = "assign",
            op = "list_available_jobs",
            worker_id = %worker.id,
            department = %worker.department,
            result_count = jobs.len(),
            "Listed available jobs"
        );
        Ok(jobs)
    }

    /// Claim a queued job for the worker.
    ///
    /// Exactly one of two racing claimants succeeds; the loser observes
    /// `Conflict`.
    pub async fn claim_job(
        &self,
        worker: &Worker,
        job_id: Uuid,
        expected_completion: DateTime<Utc>,
    ) -> Result<Job> {
        let job = self.fetch_job(job_id).await?;
        lifecycle::claim(&job, worker, expected_completion)?;

        let claimed = self
            .jobs
            .claim(job_id, worker.id, expected_completion)
            .await?
            .ok_or_else(|| {
                Error::Conflict(format!("job {} was claimed by another worker", job_id))
            })?;

        info!(
            subsystem = "assign",
            op = "claim_job",
            job_id = %job_id,
            worker_id = %worker.id,
            "Job claimed"
        );
        Ok(claimed)
    }

    /// Release an in-progress job held by this worker back to the queue.
    pub async fn unclaim_job(&self, worker: &Worker, job_id: Uuid) -> Result<()> {
        let job = self.fetch_job(job_id).await?;
        lifecycle::unclaim(&job, worker)?;

        self.jobs
            .unclaim(job_id, worker.id)
            .await?
            .ok_or_else(|| Error::Conflict(format!("job {} changed state, cannot unclaim", job_id)))?;

        info!(
            subsystem = "assign",
            op = "unclaim_job",
            job_id = %job_id,
            worker_id = %worker.id,
            "Job released back to queue"
        );
        Ok(())
    }

    /// Complete an in-progress job held by this worker.
    ///
    /// The record store increments the worker's completed-job counter in the
    /// same transaction as the status change; the oversight notification is
    /// enqueued only afterwards.
    pub async fn complete_job(&self, worker: &Worker, job_id: Uuid) -> Result<Job> {
        let job = self.fetch_job(job_id).await?;
        lifecycle::complete(&job, worker)?;

        let completed = self
            .jobs
            .complete(job_id, worker.id)
            .await?
            .ok_or_else(|| Error::Conflict(format!("job {} changed state, cannot complete", job_id)))?;

        info!(
            subsystem = "assign",
            op = "complete_job",
            job_id = %job_id,
            worker_id = %worker.id,
            "Job completed"
        );

        self.notify.send(
            &self.oversight_email,
            &format!("Job: {}, is done.", completed.task),
            &format!(
                "{} {} has done the job for the department {} : '{}'.",
                worker.name, worker.surname, completed.department, completed.task
            ),
        );

        Ok(completed)
    }

    /// Set a worker's level. Admin-only by signature; both promotion and
    /// demotion are allowed.
    pub async fn promote_worker(
        &self,
        admin: &Admin,
        worker_id: Uuid,
        new_level: Level,
    ) -> Result<Worker> {
        let worker = self
            .workers
            .set_level(worker_id, new_level)
            .await?
            .ok_or_else(|| Error::NotFound(format!("worker {}", worker_id)))?;

        info!(
            subsystem = "assign",
            op = "promote_worker",
            worker_id = %worker_id,
            level = %new_level,
            admin_id = %admin.id,
            "Worker level changed"
        );
        Ok(worker)
    }

    /// All workers with their completed-job counts, highest first, ties
    /// stable by registration order.
    pub async fn get_statistics(&self, _admin: &Admin) -> Result<Vec<WorkerStanding>> {
        self.workers.standings().await
    }

    /// All completed jobs attributed to the worker. Empty is not an error;
    /// an absent worker is `NotFound`.
    pub async fn get_worker_history(&self, _admin: &Admin, worker_id: Uuid) -> Result<Vec<Job>> {
        if self.workers.get(worker_id).await?.is_none() {
            return Err(Error::NotFound(format!("worker {}", worker_id)));
        }
        self.jobs.completed_for_worker(worker_id).await
    }

    async fn fetch_job(&self, job_id: Uuid) -> Result<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
    }
}
