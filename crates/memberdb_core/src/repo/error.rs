//! Repository error type shared by member and team repositories.
//!
//! # Invariants
//! - SQLite failures are classified exactly once, in `From<rusqlite::Error>`.
//! - Absence in may-be-empty lookups is `Ok(None)`, never an error.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Record failed write-path validation; nothing was written.
    Validation(ValidationError),
    /// Unclassified SQLite or bootstrap error.
    Db(DbError),
    /// A required lookup or a delete found no row.
    NotFound { entity: &'static str, id: i64 },
    /// A single-result query matched more than one row.
    NonUniqueResult { entity: &'static str, count: usize },
    /// Storage-enforced integrity failure (foreign key, NOT NULL, ...).
    ConstraintViolation(String),
    /// Storage could not be opened or is not a database.
    Connectivity(String),
    /// A conflicting lock was held past the busy timeout, or SQLite refused
    /// to wait because the session already holds a read lock.
    LockTimeout(String),
    /// Operation needs a persisted identity but the entity has none.
    TransientEntity(&'static str),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NonUniqueResult { entity, count } => write!(
                f,
                "query did not return a unique {entity}: {count} rows matched"
            ),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Connectivity(message) => write!(f, "storage unavailable: {message}"),
            Self::LockTimeout(message) => write!(f, "lock wait timed out: {message}"),
            Self::TransientEntity(entity) => {
                write!(f, "{entity} has no identity; save it before this operation")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        let classified = match &value {
            rusqlite::Error::SqliteFailure(failure, message) => Some((
                failure.code,
                message.clone().unwrap_or_else(|| failure.to_string()),
            )),
            _ => None,
        };

        match classified {
            Some((ErrorCode::ConstraintViolation, detail)) => Self::ConstraintViolation(detail),
            Some((ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked, detail)) => {
                Self::LockTimeout(detail)
            }
            Some((ErrorCode::CannotOpen | ErrorCode::NotADatabase, detail)) => {
                Self::Connectivity(detail)
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}
