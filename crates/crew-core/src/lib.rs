//! # crew-core
//!
//! Core types, traits, and matching rules for crewdispatch.
//!
//! This crate holds the pure half of the system: the data model, the
//! eligibility matcher, the job lifecycle state machine, and the traits the
//! record store, notifier, and identity provider implement.

pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use eligibility::{can_claim, eligible_levels_for, eligible_workers_for};
pub use error::{Error, Result};
pub use models::{
    new_v7, Admin, Job, JobStatus, Level, Principal, RegisterAdminRequest, RegisterWorkerRequest,
    SubmitJobRequest, Worker, WorkerStanding,
};
pub use traits::{
    AdminRepository, IdentityProvider, JobRepository, Notifier, WorkerRepository,
};
