//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate input before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage errors.
//! - Every mutation reports a `ChangeSet`; no-ops report an empty one.

pub mod case_repo;
pub mod change_set;
pub mod preferences_repo;
