//! Claim exclusivity against a real Postgres.
//!
//! These tests need a migrated database reachable via `DATABASE_URL` (or
//! the fixture default) and are therefore ignored by default:
//! `cargo test -p crew-db -- --ignored`.

use crew_core::{JobRepository, WorkerRepository};
use crew_db::test_fixtures::{connect_test_db, job_request, unique_department, worker_request};
use crew_db::Level;

#[tokio::test]
#[ignore]
async fn test_concurrent_claims_exactly_one_wins() {
    let db = connect_test_db().await;
    let department = unique_department("race");

    let a = db
        .workers
        .insert(&worker_request(&department, Level::Senior), "hash")
        .await
        .expect("register worker a");
    let b = db
        .workers
        .insert(&worker_request(&department, Level::Senior), "hash")
        .await
        .expect("register worker b");

    let job = db
        .jobs
        .insert(&job_request(&department, Level::Junior))
        .await
        .expect("submit job");

    let deadline = chrono::Utc::now() + chrono::Duration::hours(4);
    let (first, second) = tokio::join!(
        db.jobs.claim(job.id, a.id, deadline),
        db.jobs.claim(job.id, b.id, deadline),
    );

    let first = first.expect("claim a");
    let second = second.expect("claim b");
    assert!(
        first.is_some() ^ second.is_some(),
        "exactly one concurrent claim must succeed, got a={:?} b={:?}",
        first.is_some(),
        second.is_some()
    );

    let stored = db.jobs.get(job.id).await.expect("get job").expect("exists");
    let winner = if first.is_some() { a.id } else { b.id };
    assert_eq!(stored.assigned_to, Some(winner));
}

#[tokio::test]
#[ignore]
async fn test_complete_increments_statistics_once() {
    let db = connect_test_db().await;
    let department = unique_department("stats");

    let w = db
        .workers
        .insert(&worker_request(&department, Level::Medior), "hash")
        .await
        .expect("register worker");
    let job = db
        .jobs
        .insert(&job_request(&department, Level::Junior))
        .await
        .expect("submit job");

    let deadline = chrono::Utc::now() + chrono::Duration::hours(1);
    db.jobs
        .claim(job.id, w.id, deadline)
        .await
        .expect("claim")
        .expect("job was queued");

    let done = db
        .jobs
        .complete(job.id, w.id)
        .await
        .expect("complete")
        .expect("job was in progress");
    assert_eq!(done.status, crew_db::JobStatus::Completed);

    // Completing again is a CAS miss, not a second increment.
    assert!(db.jobs.complete(job.id, w.id).await.expect("recomplete").is_none());

    let standings = db.workers.standings().await.expect("standings");
    let row = standings
        .iter()
        .find(|s| s.worker_id == w.id)
        .expect("worker in standings");
    assert_eq!(row.completed_jobs, 1);

    let history = db
        .jobs
        .completed_for_worker(w.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, job.id);
}

#[tokio::test]
#[ignore]
async fn test_unclaim_reopens_job_for_other_workers() {
    let db = connect_test_db().await;
    let department = unique_department("reopen");

    let a = db
        .workers
        .insert(&worker_request(&department, Level::Medior), "hash")
        .await
        .expect("register worker a");
    let b = db
        .workers
        .insert(&worker_request(&department, Level::Medior), "hash")
        .await
        .expect("register worker b");
    let job = db
        .jobs
        .insert(&job_request(&department, Level::Junior))
        .await
        .expect("submit job");

    let deadline = chrono::Utc::now() + chrono::Duration::hours(1);
    db.jobs
        .claim(job.id, a.id, deadline)
        .await
        .expect("claim")
        .expect("queued");

    // Only the assignee can release it.
    assert!(db.jobs.unclaim(job.id, b.id).await.expect("unclaim b").is_none());

    let released = db
        .jobs
        .unclaim(job.id, a.id)
        .await
        .expect("unclaim a")
        .expect("was in progress");
    assert_eq!(released.assigned_to, None);
    assert_eq!(released.expected_completion, None);

    // Re-claim by the other eligible worker succeeds.
    let reclaimed = db
        .jobs
        .claim(job.id, b.id, deadline)
        .await
        .expect("reclaim")
        .expect("was queued again");
    assert_eq!(reclaimed.assigned_to, Some(b.id));
}

#[tokio::test]
#[ignore]
async fn test_list_queued_filters_department_level_status() {
    let db = connect_test_db().await;
    let department = unique_department("list");
    let other_department = unique_department("list-other");

    let junior_job = db
        .jobs
        .insert(&job_request(&department, Level::Junior))
        .await
        .expect("junior job");
    let senior_job = db
        .jobs
        .insert(&job_request(&department, Level::Senior))
        .await
        .expect("senior job");
    db.jobs
        .insert(&job_request(&other_department, Level::Junior))
        .await
        .expect("foreign job");

    let visible = db
        .jobs
        .list_queued(&department, Level::Medior)
        .await
        .expect("list");
    let ids: Vec<_> = visible.iter().map(|j| j.id).collect();
    assert!(ids.contains(&junior_job.id));
    assert!(!ids.contains(&senior_job.id), "above the worker's level");
    assert!(visible.iter().all(|j| j.department == department));
}
