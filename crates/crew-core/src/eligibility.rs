//! Eligibility matching: which jobs may a worker act on.
//!
//! Pure functions over immutable inputs. The record store applies the same
//! predicate server-side when listing jobs or discovering eligible workers;
//! this module is the single definition of the rule.

use crate::models::{Job, Level, Worker};

/// All levels a worker of the given level may handle: every level at or
/// below their own.
pub fn eligible_levels_for(level: Level) -> Vec<Level> {
    Level::ALL.iter().copied().filter(|l| *l <= level).collect()
}

/// Exact department string equality. No hierarchy, no wildcards.
pub fn department_matches(worker: &Worker, job: &Job) -> bool {
    worker.department == job.department
}

/// Worker level at or above the job's required level.
pub fn level_sufficient(worker: &Worker, job: &Job) -> bool {
    worker.level >= job.required_level
}

/// True iff the worker may claim the job. The lifecycle claim guard checks
/// the two halves separately so each failure carries its own message.
pub fn can_claim(worker: &Worker, job: &Job) -> bool {
    department_matches(worker, job) && level_sufficient(worker, job)
}

/// Filter a worker set down to those who qualify for the job.
pub fn eligible_workers_for<'a>(job: &Job, workers: &'a [Worker]) -> Vec<&'a Worker> {
    workers.iter().filter(|w| can_claim(w, job)).collect()
}
