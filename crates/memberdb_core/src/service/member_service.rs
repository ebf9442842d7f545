//! Member use-case service.
//!
//! # Responsibility
//! - Provide the entry points an outer caller (CLI, HTTP adapter) needs.
//! - Map entities to `MemberDto` at the boundary.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::member::{Member, MemberDto, MemberId};
use crate::model::team::TeamId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::member_repo::MemberRepository;
use crate::repo::paging::{Page, PageRequest};

/// Use-case service wrapper for member operations.
pub struct MemberService<R: MemberRepository> {
    repo: R,
}

impl<R: MemberRepository> MemberService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a new member and returns it with identity and audit stamps.
    pub fn register(
        &self,
        username: impl Into<String>,
        age: i32,
        team_id: Option<TeamId>,
    ) -> RepoResult<Member> {
        self.repo.save(Member::with_age(username, age, team_id))
    }

    /// Username of a required member; absence is `NotFound`.
    pub fn username_of(&self, id: MemberId) -> RepoResult<String> {
        Ok(self.repo.find(id)?.username)
    }

    /// One page of members as DTOs. The list view does not resolve team
    /// names; use `MemberRepository::find_member_dto` for that.
    pub fn list(&self, request: &PageRequest) -> RepoResult<Page<MemberDto>> {
        self.repo
            .find_all_paged(request)?
            .try_map(|member| -> RepoResult<MemberDto> {
                let id = member
                    .id
                    .ok_or_else(|| RepoError::InvalidData("paged member without id".to_string()))?;
                Ok(MemberDto::new(id, member.username, None))
            })
    }
}
