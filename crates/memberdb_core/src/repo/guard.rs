//! Connection readiness checks run by `Session::begin`.

use crate::db::migrations::{current_version, latest_version};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::Connection;

/// Table name plus the columns a repository reads or writes.
pub(crate) type TableShape = (&'static str, &'static [&'static str]);

pub(crate) const TEAMS_SHAPE: TableShape = ("teams", &["id", "name"]);

pub(crate) const MEMBERS_SHAPE: TableShape = (
    "members",
    &[
        "id",
        "username",
        "age",
        "team_id",
        "created_at",
        "updated_at",
        "created_by",
        "updated_by",
    ],
);

/// Rejects connections that were not opened through `db::open_*` or whose
/// schema drifted from what the repositories expect.
///
/// Must run outside any open transaction: each statement releases its read
/// lock when it finishes.
pub(crate) fn ensure_connection_ready(conn: &Connection, shapes: &[TableShape]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in shapes {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(RepoError::MissingRequiredTable(table));
        }
        let missing = columns
            .iter()
            .copied()
            .find(|column| !present.iter().any(|name| name == column));
        if let Some(column) = missing {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
