//! Audit metadata and the identity that stamps it.
//!
//! # Invariants
//! - `created_*` never changes after the first insert.
//! - `updated_at >= created_at` for every persisted row; updates never move
//!   `updated_at` backwards (enforced in SQL by the member repository).

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Creation/modification stamps carried by every persisted member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    /// Unix epoch milliseconds of the insert.
    pub created_at: i64,
    /// Unix epoch milliseconds of the latest `save`.
    pub updated_at: i64,
    pub created_by: String,
    pub updated_by: String,
}

impl AuditFields {
    /// Stamps for a row inserted now by `auditor`.
    pub fn created(auditor: &Auditor, now_ms: i64) -> Self {
        Self {
            created_at: now_ms,
            updated_at: now_ms,
            created_by: auditor.name().to_string(),
            updated_by: auditor.name().to_string(),
        }
    }
}

/// Who is responsible for writes made through one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auditor {
    name: String,
}

impl Auditor {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Auditor with a random v4 UUID name, used when no caller identity
    /// is available.
    pub fn anonymous() -> Self {
        Self::named(Uuid::new_v4().to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
