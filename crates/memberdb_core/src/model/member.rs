//! Member domain model.
//!
//! # Responsibility
//! - Define the canonical member record and its read projections.
//!
//! # Invariants
//! - `username` is never blank and `age` is never negative once persisted.
//! - `team_id` is the only link to a team; the team side is queried, not held.

use crate::model::audit::AuditFields;
use crate::model::team::{Team, TeamId};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Generated row identity of a member.
pub type MemberId = i64;

/// Canonical member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// `None` until the first `save`.
    pub id: Option<MemberId>,
    pub username: String,
    pub age: i32,
    /// Nullable foreign key into `teams`.
    pub team_id: Option<TeamId>,
    /// `None` until the first `save`.
    pub audit: Option<AuditFields>,
}

impl Member {
    /// Creates a transient member with age 0 and no team.
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0, None)
    }

    /// Creates a transient member with explicit age and optional team.
    pub fn with_age(username: impl Into<String>, age: i32, team_id: Option<TeamId>) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id,
            audit: None,
        }
    }

    /// Moves this member to `team_id`.
    ///
    /// Only the member side is updated; listing a team's members always goes
    /// through `MemberRepository::find_by_team_id`.
    pub fn change_team(&mut self, team_id: Option<TeamId>) {
        self.team_id = team_id;
    }

    pub fn is_transient(&self) -> bool {
        self.id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::BlankUsername);
        }
        if self.age < 0 {
            return Err(ValidationError::NegativeAge(self.age));
        }
        Ok(())
    }
}

/// Member joined with its team in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberWithTeam {
    pub member: Member,
    /// `None` when the member has no team.
    pub team: Option<Team>,
}

/// Flat projection handed to callers outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberDto {
    pub fn new(id: MemberId, username: impl Into<String>, team_name: Option<String>) -> Self {
        Self {
            id,
            username: username.into(),
            team_name,
        }
    }
}
