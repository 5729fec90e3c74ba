//! Data model for crewdispatch: workers, admins, jobs, and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Generate a time-ordered UUIDv7.
///
/// All entity ids are v7 so that insertion order is recoverable from the id
/// itself (used as the stable tie-break in statistics ordering).
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Ordered skill tier. Higher tiers subsume the capabilities of lower ones.
///
/// The derived `Ord` follows declaration order: Junior < Medior < Senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Junior,
    Medior,
    Senior,
}

impl Level {
    /// All levels, lowest first.
    pub const ALL: [Level; 3] = [Level::Junior, Level::Medior, Level::Senior];

    /// Numeric precedence: junior=1, medior=2, senior=3.
    pub fn value(self) -> i32 {
        match self {
            Level::Junior => 1,
            Level::Medior => 2,
            Level::Senior => 3,
        }
    }

    /// Database/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Junior => "junior",
            Level::Medior => "medior",
            Level::Senior => "senior",
        }
    }

    /// Parse a level string. Unknown values are an input error.
    pub fn parse(s: &str) -> Result<Level> {
        match s {
            "junior" => Ok(Level::Junior),
            "medior" => Ok(Level::Medior),
            "senior" => Ok(Level::Senior),
            other => Err(Error::InvalidInput(format!("unknown level '{}'", other))),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level> {
        Level::parse(s)
    }
}

/// Job lifecycle status. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<JobStatus> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            other => Err(Error::InvalidInput(format!("unknown job status '{}'", other))),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered worker.
///
/// `department` and `level` are immutable from the worker's side; only an
/// admin changes `level` (promotion or demotion). Workers are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub department: String,
    pub level: Level,
    pub email: String,
    /// Opaque password hash. Never leaves the service.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// An administrator. Admins promote workers and read statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A unit of work with a department and a required skill level.
///
/// Invariant: `assigned_to` is non-null iff `status == InProgress`.
/// `department` and `required_level` are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub task: String,
    /// Opaque caller-supplied payload.
    pub payload: JsonValue,
    pub department: String,
    pub required_level: Level,
    pub status: JobStatus,
    pub assigned_to: Option<Uuid>,
    pub expected_completion: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One worker's row in the statistics leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStanding {
    pub worker_id: Uuid,
    pub name: String,
    pub surname: String,
    pub level: Level,
    pub completed_jobs: i64,
}

/// Authenticated actor performing an operation.
///
/// The identity provider resolves a credential to exactly one of these
/// variants; role dispatch is by variant, never by inspecting a role field.
#[derive(Debug, Clone)]
pub enum Principal {
    Worker(Worker),
    Admin(Admin),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Worker(w) => w.id,
            Principal::Admin(a) => a.id,
        }
    }

    /// Role tag used in credential claims.
    pub fn role(&self) -> &'static str {
        match self {
            Principal::Worker(_) => "worker",
            Principal::Admin(_) => "admin",
        }
    }
}

/// Request payload for worker registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterWorkerRequest {
    pub name: String,
    pub surname: String,
    pub department: String,
    pub level: Level,
    pub email: String,
    pub password: String,
}

/// Request payload for admin registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAdminRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

/// Request payload for job submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJobRequest {
    pub task: String,
    pub payload: JsonValue,
    pub department: String,
    pub required_level: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_total_order() {
        assert!(Level::Junior < Level::Medior);
        assert!(Level::Medior < Level::Senior);
        assert!(Level::Junior < Level::Senior);
    }

    #[test]
    fn test_level_values() {
        assert_eq!(Level::Junior.value(), 1);
        assert_eq!(Level::Medior.value(), 2);
        assert_eq!(Level::Senior.value(), 3);
    }

    #[test]
    fn test_level_parse_round_trip() {
        for level in Level::ALL {
            assert_eq!(Level::parse(level.as_str()).unwrap(), level);
        }
    }

    #[test]
    fn test_level_parse_unknown_is_invalid_input() {
        let err = Level::parse("expert").unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.contains("expert")),
            _ => panic!("Expected InvalidInput"),
        }
    }

    #[test]
    fn test_level_parse_case_sensitive() {
        assert!(Level::parse("Junior").is_err());
        assert!(Level::parse("SENIOR").is_err());
    }

    #[test]
    fn test_level_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Medior).unwrap(), "\"medior\"");
        let back: Level = serde_json::from_str("\"senior\"").unwrap();
        assert_eq!(back, Level::Senior);
    }

    #[test]
    fn test_job_status_parse() {
        assert_eq!(JobStatus::parse("queued").unwrap(), JobStatus::Queued);
        assert_eq!(
            JobStatus::parse("in_progress").unwrap(),
            JobStatus::InProgress
        );
        assert_eq!(JobStatus::parse("completed").unwrap(), JobStatus::Completed);
        assert!(JobStatus::parse("cancelled").is_err());
    }

    #[test]
    fn test_principal_role_by_variant() {
        let now = Utc::now();
        let worker = Worker {
            id: new_v7(),
            name: "Ana".into(),
            surname: "Ilievska".into(),
            department: "eng".into(),
            level: Level::Junior,
            email: "ana@example.com".into(),
            password_hash: String::new(),
            created_at: now,
        };
        let admin = Admin {
            id: new_v7(),
            name: "Marko".into(),
            surname: "Stojanov".into(),
            email: "marko@example.com".into(),
            password_hash: String::new(),
            created_at: now,
        };
        assert_eq!(Principal::Worker(worker).role(), "worker");
        assert_eq!(Principal::Admin(admin).role(), "admin");
    }

    #[test]
    fn test_worker_serialization_omits_password_hash() {
        let worker = Worker {
            id: new_v7(),
            name: "Ana".into(),
            surname: "Ilievska".into(),
            department: "eng".into(),
            level: Level::Junior,
            email: "ana@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&worker).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_new_v7_is_time_ordered() {
        let a = new_v7();
        let b = new_v7();
        assert!(a <= b);
    }
}
