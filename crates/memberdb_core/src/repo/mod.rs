//! Repository layer: unit of work, paging and SQLite-backed repositories.
//!
//! # Responsibility
//! - Define typed data-access contracts for members and teams.
//! - Isolate SQL details from service/caller code.
//!
//! # Invariants
//! - Every repository is bound to one `Session` and checks the schema on
//!   construction.
//! - Repositories return semantic errors (`NotFound`, `NonUniqueResult`,
//!   `ConstraintViolation`, `LockTimeout`) in addition to DB transport errors.

pub mod error;
mod guard;
pub mod member_repo;
pub mod paging;
pub mod session;
pub mod team_repo;
