//! Domain model for cases, observations and checklist signs.
//!
//! # Responsibility
//! - Define canonical data structures used by store and triage logic.
//! - Own structural validation shared by every write path.
//!
//! # Invariants
//! - Every case and observation is identified by a stable UUID.
//! - Enumerated fields are closed sets; unknown text never becomes a value.

pub mod case;
pub mod observation;
pub mod sign;
pub mod validation;
