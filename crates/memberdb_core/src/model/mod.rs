//! Domain model for members, teams and their audit metadata.
//!
//! # Responsibility
//! - Define the records persisted by repositories and returned to callers.
//! - Keep relationships as explicit foreign-key fields, never object graphs.
//!
//! # Invariants
//! - `id == None` means the entity is transient (never saved).
//! - Audit fields are stamped by `save`, not by the model itself.

pub mod audit;
pub mod member;
pub mod team;
pub mod validation;
