//! Team repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Teams are not tracked by the session identity map; every read hits storage.
//! - A team referenced by any member cannot be deleted (`ConstraintViolation`).

use crate::model::team::{Team, TeamId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::session::Session;
use log::debug;
use rusqlite::{params, Connection, Row};

const TEAM_ENTITY: &str = "team";

/// Repository interface for team persistence.
pub trait TeamRepository {
    fn save(&self, team: Team) -> RepoResult<Team>;
    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>>;
    fn find_all(&self) -> RepoResult<Vec<Team>>;
    fn count(&self) -> RepoResult<u64>;
    fn delete(&self, team: &Team) -> RepoResult<()>;
}

/// SQLite-backed team repository bound to one unit of work.
pub struct SqliteTeamRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqliteTeamRepository<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn conn(&self) -> &Connection {
        self.session.connection()
    }
}

impl TeamRepository for SqliteTeamRepository<'_, '_> {
    fn save(&self, mut team: Team) -> RepoResult<Team> {
        team.validate()?;

        match team.id {
            None => {
                self.conn().execute(
                    "INSERT INTO teams (name) VALUES (?1);",
                    [team.name.as_str()],
                )?;
                team.id = Some(self.conn().last_insert_rowid());
            }
            Some(id) => {
                let changed = self.conn().execute(
                    "UPDATE teams SET name = ?2 WHERE id = ?1;",
                    params![id, team.name.as_str()],
                )?;
                if changed == 0 {
                    return Err(RepoError::NotFound {
                        entity: TEAM_ENTITY,
                        id,
                    });
                }
            }
        }

        debug!(
            "event=team_save module=repo status=ok id={}",
            team.id.unwrap_or_default()
        );
        Ok(team)
    }

    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name FROM teams WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_team_row(row)?));
        }
        Ok(None)
    }

    fn find_all(&self) -> RepoResult<Vec<Team>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name FROM teams ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut teams = Vec::new();
        while let Some(row) = rows.next()? {
            teams.push(parse_team_row(row)?);
        }
        Ok(teams)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(id) FROM teams;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn delete(&self, team: &Team) -> RepoResult<()> {
        let id = team.id.ok_or(RepoError::TransientEntity(TEAM_ENTITY))?;
        let changed = self
            .conn()
            .execute("DELETE FROM teams WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: TEAM_ENTITY,
                id,
            });
        }
        debug!("event=team_delete module=repo status=ok id={id}");
        Ok(())
    }
}

fn parse_team_row(row: &Row<'_>) -> RepoResult<Team> {
    let team = Team {
        id: Some(row.get("id")?),
        name: row.get("name")?,
    };
    team.validate()
        .map_err(|err| RepoError::InvalidData(format!("teams.id={:?}: {err}", team.id)))?;
    Ok(team)
}
