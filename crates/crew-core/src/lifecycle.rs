//! Job lifecycle state machine.
//!
//! States: `queued -> in_progress -> completed`, with `in_progress -> queued`
//! (unclaim) as the only backward transition. `completed` is terminal.
//!
//! The functions here are the pure guards-and-transition half of the machine:
//! they validate `(job, worker)` and produce the job as it should be
//! persisted. The record store re-asserts the status precondition inside its
//! compare-and-set UPDATE, so a transition that raced another caller comes
//! back as a CAS miss and is reported as `Conflict`.

use chrono::{DateTime, Utc};

use crate::eligibility::{department_matches, level_sufficient};
use crate::error::{Error, Result};
use crate::models::{Job, JobStatus, Worker};

/// Guard and apply the `claim` transition.
///
/// Fails `Conflict` when the job is not queued and `Forbidden` on a
/// department mismatch or insufficient level.
pub fn claim(job: &Job, worker: &Worker, expected_completion: DateTime<Utc>) -> Result<Job> {
    if job.status != JobStatus::Queued {
        return Err(Error::Conflict(format!(
            "job {} is '{}', cannot claim",
            job.id, job.status
        )));
    }
    if !department_matches(worker, job) {
        return Err(Error::Forbidden(format!(
            "job {} belongs to department '{}'",
            job.id, job.department
        )));
    }
    if !level_sufficient(worker, job) {
        return Err(Error::Forbidden(format!(
            "job {} requires level '{}'",
            job.id, job.required_level
        )));
    }

    let mut next = job.clone();
    next.status = JobStatus::InProgress;
    next.assigned_to = Some(worker.id);
    next.expected_completion = Some(expected_completion);
    Ok(next)
}

/// Guard and apply the `unclaim` transition: the assignee releases the job
/// back to the queue.
pub fn unclaim(job: &Job, worker: &Worker) -> Result<Job> {
    if job.status != JobStatus::InProgress {
        return Err(Error::Conflict(format!(
            "job {} is '{}', cannot unclaim",
            job.id, job.status
        )));
    }
    if job.assigned_to != Some(worker.id) {
        return Err(Error::Forbidden(format!(
            "job {} is not assigned to worker {}",
            job.id, worker.id
        )));
    }

    let mut next = job.clone();
    next.status = JobStatus::Queued;
    next.assigned_to = None;
    next.expected_completion = None;
    Ok(next)
}

/// Guard and apply the `complete` transition.
///
/// Only the current assignee completes a job, and only from `in_progress`.
/// Both guard failures surface as `Conflict` (invalid job state for this
/// caller). The statistics increment is a persistence-side effect of the
/// same transaction, not part of the pure transition.
pub fn complete(job: &Job, worker: &Worker) -> Result<Job> {
    if job.status != JobStatus::InProgress || job.assigned_to != Some(worker.id) {
        return Err(Error::Conflict(format!(
            "job {} is not in progress for worker {}",
            job.id, worker.id
        )));
    }

    let mut next = job.clone();
    next.status = JobStatus::Completed;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_v7, Level};

    fn worker(department: &str, level: Level) -> Worker {
        Worker {
            id: new_v7(),
            name: "Test".into(),
            surname: "Worker".into(),
            department: department.into(),
            level,
            email: format!("{}@example.com", new_v7()),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn queued_job(department: &str, required_level: Level) -> Job {
        Job {
            id: new_v7(),
            task: "review drawings".into(),
            payload: serde_json::json!({"floor": 3}),
            department: department.into(),
            required_level,
            status: JobStatus::Queued,
            assigned_to: None,
            expected_completion: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_claim_sets_assignee_and_deadline() {
        let w = worker("eng", Level::Senior);
        let job = queued_job("eng", Level::Medior);
        let deadline = Utc::now();

        let claimed = claim(&job, &w, deadline).unwrap();
        assert_eq!(claimed.status, JobStatus::InProgress);
        assert_eq!(claimed.assigned_to, Some(w.id));
        assert_eq!(claimed.expected_completion, Some(deadline));
    }

    #[test]
    fn test_claim_below_required_level_is_forbidden() {
        let w = worker("eng", Level::Junior);
        let job = queued_job("eng", Level::Medior);
        match claim(&job, &w, Utc::now()) {
            Err(Error::Forbidden(_)) => {}
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_claim_wrong_department_is_forbidden() {
        let w = worker("sales", Level::Senior);
        let job = queued_job("eng", Level::Junior);
        assert!(matches!(
            claim(&job, &w, Utc::now()),
            Err(Error::Forbidden(_))
        ));
    }

    // The claim guard and the matcher are the same rule; a queued job is
    // claimable exactly when can_claim says so.
    #[test]
    fn test_claim_guard_agrees_with_matcher() {
        use crate::eligibility::can_claim;

        for worker_level in Level::ALL {
            for required in Level::ALL {
                for department in ["eng", "sales"] {
                    let w = worker(department, worker_level);
                    let job = queued_job("eng", required);
                    assert_eq!(
                        claim(&job, &w, Utc::now()).is_ok(),
                        can_claim(&w, &job),
                        "worker {}/{} vs job eng/{}",
                        department,
                        worker_level,
                        required
                    );
                }
            }
        }
    }

    #[test]
    fn test_claim_non_queued_is_conflict() {
        let w = worker("eng", Level::Senior);
        let mut job = queued_job("eng", Level::Junior);
        job.status = JobStatus::InProgress;
        job.assigned_to = Some(new_v7());
        assert!(matches!(
            claim(&job, &w, Utc::now()),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_completed_is_terminal() {
        let w = worker("eng", Level::Senior);
        let mut job = queued_job("eng", Level::Junior);
        job.status = JobStatus::Completed;

        assert!(matches!(
            claim(&job, &w, Utc::now()),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(unclaim(&job, &w), Err(Error::Conflict(_))));
        assert!(matches!(complete(&job, &w), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_unclaim_restores_queued() {
        let w = worker("eng", Level::Medior);
        let job = queued_job("eng", Level::Junior);
        let claimed = claim(&job, &w, Utc::now()).unwrap();

        let released = unclaim(&claimed, &w).unwrap();
        assert_eq!(released.status, JobStatus::Queued);
        assert_eq!(released.assigned_to, None);
        assert_eq!(released.expected_completion, None);
    }

    #[test]
    fn test_unclaim_by_non_assignee_is_forbidden() {
        let assignee = worker("eng", Level::Medior);
        let other = worker("eng", Level::Senior);
        let job = queued_job("eng", Level::Junior);
        let claimed = claim(&job, &assignee, Utc::now()).unwrap();

        assert!(matches!(
            unclaim(&claimed, &other),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_complete_requires_current_assignee() {
        let assignee = worker("eng", Level::Medior);
        let other = worker("eng", Level::Senior);
        let job = queued_job("eng", Level::Junior);
        let claimed = claim(&job, &assignee, Utc::now()).unwrap();

        assert!(matches!(complete(&claimed, &other), Err(Error::Conflict(_))));
        let done = complete(&claimed, &assignee).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        // assignee reference survives completion for history queries
        assert_eq!(done.assigned_to, Some(assignee.id));
    }

    #[test]
    fn test_complete_from_queued_is_conflict() {
        let w = worker("eng", Level::Senior);
        let job = queued_job("eng", Level::Junior);
        assert!(matches!(complete(&job, &w), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_reclaim_after_unclaim_by_different_worker() {
        let first = worker("eng", Level::Medior);
        let second = worker("eng", Level::Senior);
        let job = queued_job("eng", Level::Medior);

        let claimed = claim(&job, &first, Utc::now()).unwrap();
        let released = unclaim(&claimed, &first).unwrap();
        let reclaimed = claim(&released, &second, Utc::now()).unwrap();
        assert_eq!(reclaimed.assigned_to, Some(second.id));
    }
}
