//! Structured logging field name constants for crewdispatch.
//!
//! All crates use these constants so log aggregation tools can query by the
//! same field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (e.g. dropped notification) |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, guard outcomes |

/// Subsystem originating the log event.
/// Values: "api", "db", "assign", "notify"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "dispatcher", "service"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "submit_job", "claim_job", "complete_job"
pub const OPERATION: &str = "op";

/// Job UUID being operated on.
pub const JOB_ID: &str = "job_id";

/// Worker UUID acting or being acted upon.
pub const WORKER_ID: &str = "worker_id";

/// Department tag of the job or worker.
pub const DEPARTMENT: &str = "department";

/// Skill level involved in a guard or promotion.
pub const LEVEL: &str = "level";

/// Notification recipient address.
pub const RECIPIENT: &str = "recipient";

/// Number of results returned by a listing or discovery query.
pub const RESULT_COUNT: &str = "result_count";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
