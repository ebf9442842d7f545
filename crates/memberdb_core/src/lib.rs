//! Core data access for members and teams.
//! Repositories, the unit of work and paging live here; callers only see
//! the typed API re-exported below.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::audit::{AuditFields, Auditor};
pub use model::member::{Member, MemberDto, MemberId, MemberWithTeam};
pub use model::team::{Team, TeamId};
pub use model::validation::ValidationError;
pub use repo::error::{RepoError, RepoResult};
pub use repo::member_repo::{MemberQuery, MemberRepository, SqliteMemberRepository};
pub use repo::paging::{Direction, Order, Page, PageRequest, Slice, Sort, SortProperty};
pub use repo::session::Session;
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use service::member_service::MemberService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
