//! crew-assign: the assignment service.
//!
//! Sits between the HTTP layer and the record store: pure lifecycle guards
//! from crew-core decide whether a transition is allowed, the record store's
//! compare-and-set writes make it exclusive, and the notification handle
//! gets lifecycle events without ever blocking a request.

pub mod memory;
pub mod service;

pub use memory::InMemoryStore;
pub use service::AssignmentService;
