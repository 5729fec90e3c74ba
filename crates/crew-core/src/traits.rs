//! Collaborator traits: the record store, the notifier, and the identity
//! provider. Implementations live in crew-db, crew-notify, and crew-api;
//! crew-assign ships in-memory versions for service-level tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Admin, Job, Level, Principal, RegisterAdminRequest, RegisterWorkerRequest, SubmitJobRequest,
    Worker, WorkerStanding,
};

/// Worker storage. Registration creates the worker and its statistics row
/// together; the pair is never orphaned.
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// Insert a worker (and its zeroed statistics row) and return it.
    /// A duplicate email is a `Conflict`.
    async fn insert(&self, req: &RegisterWorkerRequest, password_hash: &str) -> Result<Worker>;

    /// Fetch a worker by id.
    async fn get(&self, id: Uuid) -> Result<Option<Worker>>;

    /// Fetch a worker by email (login path).
    async fn find_by_email(&self, email: &str) -> Result<Option<Worker>>;

    /// All workers in `department` with level >= `required_level` — the
    /// eligible-worker set for a job, computed, not stored.
    async fn eligible_for(&self, department: &str, required_level: Level) -> Result<Vec<Worker>>;

    /// Set a worker's level unconditionally (admin promotion or demotion).
    /// Returns `None` if the worker does not exist.
    async fn set_level(&self, id: Uuid, level: Level) -> Result<Option<Worker>>;

    /// All workers with their completed-job counters, descending by count,
    /// ties stable by registration order.
    async fn standings(&self) -> Result<Vec<WorkerStanding>>;
}

/// Admin storage.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn insert(&self, req: &RegisterAdminRequest, password_hash: &str) -> Result<Admin>;

    async fn get(&self, id: Uuid) -> Result<Option<Admin>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>>;
}

/// Job storage and the persistence half of the lifecycle state machine.
///
/// `claim`, `unclaim`, and `complete` are compare-and-set operations: the
/// status (and assignee) precondition is part of the UPDATE predicate, and a
/// CAS miss comes back as `Ok(None)` so the caller can report `Conflict`
/// deterministically. This is what makes racing claims safe (§ concurrency).
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persist a new job in `queued` state.
    async fn insert(&self, req: &SubmitJobRequest) -> Result<Job>;

    /// Fetch a job by id.
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// Queued jobs in `department` requiring any level <= `max_level`,
    /// in insertion order.
    async fn list_queued(&self, department: &str, max_level: Level) -> Result<Vec<Job>>;

    /// Atomically move a queued job to `in_progress` for `worker_id`.
    /// `Ok(None)` means the job was no longer queued when the write ran.
    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        expected_completion: DateTime<Utc>,
    ) -> Result<Option<Job>>;

    /// Atomically release an in-progress job held by `worker_id` back to
    /// `queued`. `Ok(None)` means the precondition no longer held.
    async fn unclaim(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>>;

    /// Atomically complete an in-progress job held by `worker_id` and,
    /// in the same transaction, increment that worker's completed-job
    /// counter. `Ok(None)` means the precondition no longer held.
    async fn complete(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>>;

    /// Completed jobs that were assigned to `worker_id`, newest last.
    async fn completed_for_worker(&self, worker_id: Uuid) -> Result<Vec<Job>>;
}

/// Outbound notification delivery. Best-effort: the dispatcher swallows
/// errors, and duplicate sends are acceptable.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Resolves a request credential to an authenticated principal.
///
/// The core never issues or validates credential tokens itself; any failure
/// is `Unauthenticated`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Principal>;
}
