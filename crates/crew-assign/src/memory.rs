//! In-memory record store for service-level tests and local experiments.
//!
//! One mutex guards all records, so every compare-and-set transition is
//! atomic with respect to concurrent callers — the same exclusivity the
//! Postgres store gets from predicated UPDATEs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crew_core::{
    new_v7, Admin, AdminRepository, Error, Job, JobRepository, JobStatus, Level,
    RegisterAdminRequest, RegisterWorkerRequest, Result, SubmitJobRequest, Worker,
    WorkerRepository, WorkerStanding,
};

#[derive(Default)]
struct Records {
    workers: Vec<Worker>,
    admins: Vec<Admin>,
    jobs: Vec<Job>,
    completed_counts: HashMap<Uuid, i64>,
}

/// Mutex-guarded record store implementing all three repository traits.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Records>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        // Poisoning only happens if a holder panicked; tests want the state
        // regardless.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WorkerRepository for InMemoryStore {
    async fn insert(&self, req: &RegisterWorkerRequest, password_hash: &str) -> Result<Worker> {
        let mut records = self.lock();
        if records.workers.iter().any(|w| w.email == req.email)
            || records.admins.iter().any(|a| a.email == req.email)
        {
            return Err(Error::Conflict("worker already registered".into()));
        }
        let worker = Worker {
            id: new_v7(),
            name: req.name.clone(),
            surname: req.surname.clone(),
            department: req.department.clone(),
            level: req.level,
            email: req.email.clone(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        records.completed_counts.insert(worker.id, 0);
        records.workers.push(worker.clone());
        Ok(worker)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Worker>> {
        Ok(self.lock().workers.iter().find(|w| w.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Worker>> {
        Ok(self
            .lock()
            .workers
            .iter()
            .find(|w| w.email == email)
            .cloned())
    }

    async fn eligible_for(&self, department: &str, required_level: Level) -> Result<Vec<Worker>> {
        Ok(self
            .lock()
            .workers
            .iter()
            .filter(|w| w.department == department && w.level >= required_level)
            .cloned()
            .collect())
    }

    async fn set_level(&self, id: Uuid, level: Level) -> Result<Option<Worker>> {
        let mut records = self.lock();
        let Some(worker) = records.workers.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        worker.level = level;
        Ok(Some(worker.clone()))
    }

    async fn standings(&self) -> Result<Vec<WorkerStanding>> {
        let records = self.lock();
        let mut standings: Vec<WorkerStanding> = records
            .workers
            .iter()
            .map(|w| WorkerStanding {
                worker_id: w.id,
                name: w.name.clone(),
                surname: w.surname.clone(),
                level: w.level,
                completed_jobs: records.completed_counts.get(&w.id).copied().unwrap_or(0),
            })
            .collect();
        // Descending by count; v7 ids make the tie-break registration order.
        standings.sort_by(|a, b| {
            b.completed_jobs
                .cmp(&a.completed_jobs)
                .then(a.worker_id.cmp(&b.worker_id))
        });
        Ok(standings)
    }
}

#[async_trait]
impl AdminRepository for InMemoryStore {
    async fn insert(&self, req: &RegisterAdminRequest, password_hash: &str) -> Result<Admin> {
        let mut records = self.lock();
        if records.admins.iter().any(|a| a.email == req.email)
            || records.workers.iter().any(|w| w.email == req.email)
        {
            return Err(Error::Conflict("admin already registered".into()));
        }
        let admin = Admin {
            id: new_v7(),
            name: req.name.clone(),
            surname: req.surname.clone(),
            email: req.email.clone(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        records.admins.push(admin.clone());
        Ok(admin)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Admin>> {
        Ok(self.lock().admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        Ok(self
            .lock()
            .admins
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn insert(&self, req: &SubmitJobRequest) -> Result<Job> {
        let job = Job {
            id: new_v7(),
            task: req.task.clone(),
            payload: req.payload.clone(),
            department: req.department.clone(),
            required_level: req.required_level,
            status: JobStatus::Queued,
            assigned_to: None,
            expected_completion: None,
            created_at: Utc::now(),
        };
        self.lock().jobs.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.lock().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_queued(&self, department: &str, max_level: Level) -> Result<Vec<Job>> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|j| {
                j.status == JobStatus::Queued
                    && j.department == department
                    && j.required_level <= max_level
            })
            .cloned()
            .collect())
    }

    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        expected_completion: DateTime<Utc>,
    ) -> Result<Option<Job>> {
        let mut records = self.lock();
        let Some(job) = records
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Queued)
        else {
            return Ok(None);
        };
        job.status = JobStatus::InProgress;
        job.assigned_to = Some(worker_id);
        job.expected_completion = Some(expected_completion);
        Ok(Some(job.clone()))
    }

    async fn unclaim(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>> {
        let mut records = self.lock();
        let Some(job) = records.jobs.iter_mut().find(|j| {
            j.id == job_id && j.status == JobStatus::InProgress && j.assigned_to == Some(worker_id)
        }) else {
            return Ok(None);
        };
        job.status = JobStatus::Queued;
        job.assigned_to = None;
        job.expected_completion = None;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: Uuid, worker_id: Uuid) -> Result<Option<Job>> {
        let mut records = self.lock();
        let Some(job) = records.jobs.iter_mut().find(|j| {
            j.id == job_id && j.status == JobStatus::InProgress && j.assigned_to == Some(worker_id)
        }) else {
            return Ok(None);
        };
        job.status = JobStatus::Completed;
        let completed = job.clone();
        *records.completed_counts.entry(worker_id).or_insert(0) += 1;
        Ok(Some(completed))
    }

    async fn completed_for_worker(&self, worker_id: Uuid) -> Result<Vec<Job>> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed && j.assigned_to == Some(worker_id))
            .cloned()
            .collect())
    }
}
