//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, named finders, paging, bulk update and locking reads over
//!   the `members` table.
//! - Keep every query a static, named statement; no query text is derived
//!   from method names or caller strings.
//!
//! # Invariants
//! - Write paths call `Member::validate()` before SQL mutations.
//! - Every tracked read goes through the session identity map, so a row
//!   that is already managed is returned as managed, not as re-read.
//! - `bulk_age_plus` never touches the identity map.
//! - Single-result finders fail with `NonUniqueResult` on more than one row.

use crate::model::audit::{now_epoch_ms, AuditFields};
use crate::model::member::{Member, MemberDto, MemberId, MemberWithTeam};
use crate::model::team::{Team, TeamId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::paging::{total_from_content, Page, PageRequest, Slice};
use crate::repo::session::Session;
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};

const MEMBER_ENTITY: &str = "member";

const MEMBER_COLUMNS: &str = "m.id AS id,
    m.username AS username,
    m.age AS age,
    m.team_id AS team_id,
    m.created_at AS created_at,
    m.updated_at AS updated_at,
    m.created_by AS created_by,
    m.updated_by AS updated_by";

const TEAM_COLUMNS: &str = "t.id AS team_ref_id,
    t.name AS team_name";

/// Optional filters combined with `AND` by `find_all_matching`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberQuery {
    /// Exact username match.
    pub username: Option<String>,
    /// Exact name match of the member's team; members without a team never match.
    pub team_name: Option<String>,
    /// Strict lower bound on age.
    pub age_greater_than: Option<i32>,
}

/// Repository interface for member persistence and queries.
pub trait MemberRepository {
    /// Inserts a transient member or updates a persisted one; returns the
    /// stored state with identity and audit stamps.
    fn save(&self, member: Member) -> RepoResult<Member>;
    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>>;
    /// Required lookup. Absence is reported as `RepoError::NotFound`, never
    /// as an empty value; use `find_by_id` when absence is expected.
    fn find(&self, id: MemberId) -> RepoResult<Member>;
    fn find_all(&self) -> RepoResult<Vec<Member>>;
    /// All members with their team fetched in the same query (left join).
    fn find_all_with_team(&self) -> RepoResult<Vec<MemberWithTeam>>;
    /// Members that have a team, fetched together with it (inner join).
    fn find_member_fetch(&self) -> RepoResult<Vec<MemberWithTeam>>;
    fn count(&self) -> RepoResult<u64>;
    fn delete(&self, member: &Member) -> RepoResult<()>;
    fn delete_by_id(&self, id: MemberId) -> RepoResult<()>;
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>>;
    /// Members with exactly this username and age.
    fn find_member(&self, username: &str, age: i32) -> RepoResult<Vec<Member>>;
    fn find_username_list(&self) -> RepoResult<Vec<String>>;
    /// DTO projection of members joined with their team name.
    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>>;
    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>>;
    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    fn find_by_age(&self, age: i32, request: &PageRequest) -> RepoResult<Page<Member>>;
    fn find_slice_by_age(&self, age: i32, request: &PageRequest) -> RepoResult<Slice<Member>>;
    fn find_all_paged(&self, request: &PageRequest) -> RepoResult<Page<Member>>;
    /// Adds one year to every member aged `age` or older in one statement.
    /// Returns the number of updated rows.
    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize>;
    /// Read that skips change tracking for rows not already managed.
    fn find_readonly_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    /// Read that holds the write lock until the session ends. A competing
    /// session waits up to the connection's busy timeout, then fails with
    /// `LockTimeout`.
    fn find_lock_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    fn find_by_team_id(&self, team_id: TeamId) -> RepoResult<Vec<Member>>;
    fn find_all_matching(&self, query: &MemberQuery) -> RepoResult<Vec<Member>>;
}

/// SQLite-backed member repository bound to one unit of work.
pub struct SqliteMemberRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqliteMemberRepository<'s, 'conn> {
    /// Binds the repository to a session; the schema was checked when the
    /// session began.
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn conn(&self) -> &Connection {
        self.session.connection()
    }

    fn query_managed<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn().prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let (id, loaded) = parse_member_row(row)?;
            members.push(self.session.manage(id, loaded));
        }
        Ok(members)
    }

    fn query_with_team<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<MemberWithTeam>> {
        let mut stmt = self.conn().prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let (id, loaded) = parse_member_row(row)?;
            let team = parse_joined_team(row)?;
            items.push(MemberWithTeam {
                member: self.session.manage(id, loaded),
                team,
            });
        }
        Ok(items)
    }

    fn count_where<P: Params>(&self, predicate: &str, params: P) -> RepoResult<u64> {
        let count: i64 = self.conn().query_row(
            &format!("SELECT COUNT(m.id) FROM members m{predicate};"),
            params,
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn insert(&self, mut member: Member) -> RepoResult<Member> {
        let audit = AuditFields::created(self.session.auditor(), now_epoch_ms());
        self.conn().execute(
            "INSERT INTO members (
                username,
                age,
                team_id,
                created_at,
                updated_at,
                created_by,
                updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                member.username.as_str(),
                member.age,
                member.team_id,
                audit.created_at,
                audit.updated_at,
                audit.created_by.as_str(),
                audit.updated_by.as_str(),
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        member.id = Some(id);
        member.audit = Some(audit);
        self.session.store(id, &member);
        debug!("event=member_save module=repo status=ok op=insert id={id}");
        Ok(member)
    }

    fn update(&self, id: MemberId, mut member: Member) -> RepoResult<Member> {
        let updated_by = self.session.auditor().name().to_string();
        let stamps = self
            .conn()
            .query_row(
                "UPDATE members
                 SET
                    username = ?2,
                    age = ?3,
                    team_id = ?4,
                    updated_at = MAX(updated_at, ?5),
                    updated_by = ?6
                 WHERE id = ?1
                 RETURNING created_at, updated_at, created_by;",
                params![
                    id,
                    member.username.as_str(),
                    member.age,
                    member.team_id,
                    now_epoch_ms(),
                    updated_by.as_str(),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((created_at, updated_at, created_by)) = stamps else {
            return Err(RepoError::NotFound {
                entity: MEMBER_ENTITY,
                id,
            });
        };

        member.audit = Some(AuditFields {
            created_at,
            updated_at,
            created_by,
            updated_by,
        });
        self.session.store(id, &member);
        debug!("event=member_save module=repo status=ok op=update id={id}");
        Ok(member)
    }

    fn page_where<P>(
        &self,
        predicate: &str,
        params: P,
        request: &PageRequest,
    ) -> RepoResult<Page<Member>>
    where
        P: Params + Clone,
    {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members m{predicate}{} LIMIT {} OFFSET {};",
            request.sort().order_by_clause("m"),
            request.size(),
            request.offset()
        );
        let content = self.query_managed(&sql, params.clone())?;

        let total = match total_from_content(request, content.len()) {
            Some(total) => {
                debug!(
                    "event=member_page module=repo status=ok count_query=skipped total={total}"
                );
                total
            }
            None => {
                let total = self.count_where(predicate, params)?;
                debug!(
                    "event=member_page module=repo status=ok count_query=executed total={total}"
                );
                total
            }
        };

        Ok(Page::new(content, request, total))
    }
}

impl MemberRepository for SqliteMemberRepository<'_, '_> {
    fn save(&self, member: Member) -> RepoResult<Member> {
        member.validate()?;
        match member.id {
            None => self.insert(member),
            Some(id) => self.update(id, member),
        }
    }

    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>> {
        if let Some(managed) = self.session.cached(id) {
            return Ok(Some(managed));
        }

        let mut found = self.query_managed(
            &format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.id = ?1;"),
            [id],
        )?;
        Ok(found.pop())
    }

    fn find(&self, id: MemberId) -> RepoResult<Member> {
        self.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: MEMBER_ENTITY,
            id,
        })
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.query_managed(
            &format!("SELECT {MEMBER_COLUMNS} FROM members m ORDER BY m.id ASC;"),
            [],
        )
    }

    fn find_all_with_team(&self) -> RepoResult<Vec<MemberWithTeam>> {
        self.query_with_team(
            &format!(
                "SELECT {MEMBER_COLUMNS}, {TEAM_COLUMNS}
                 FROM members m
                 LEFT JOIN teams t ON t.id = m.team_id
                 ORDER BY m.id ASC;"
            ),
            [],
        )
    }

    fn find_member_fetch(&self) -> RepoResult<Vec<MemberWithTeam>> {
        self.query_with_team(
            &format!(
                "SELECT {MEMBER_COLUMNS}, {TEAM_COLUMNS}
                 FROM members m
                 INNER JOIN teams t ON t.id = m.team_id
                 ORDER BY m.id ASC;"
            ),
            [],
        )
    }

    fn count(&self) -> RepoResult<u64> {
        self.count_where("", [])
    }

    fn delete(&self, member: &Member) -> RepoResult<()> {
        let id = member.id.ok_or(RepoError::TransientEntity(MEMBER_ENTITY))?;
        self.delete_by_id(id)
    }

    fn delete_by_id(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM members WHERE id = ?1;", [id])?;
        self.session.evict(id);

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: MEMBER_ENTITY,
                id,
            });
        }

        debug!("event=member_delete module=repo status=ok id={id}");
        Ok(())
    }

    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>> {
        self.query_managed(
            &format!(
                "SELECT {MEMBER_COLUMNS}
                 FROM members m
                 WHERE m.username = ?1
                   AND m.age > ?2
                 ORDER BY m.id ASC;"
            ),
            params![username, age],
        )
    }

    fn find_member(&self, username: &str, age: i32) -> RepoResult<Vec<Member>> {
        self.query_managed(
            &format!(
                "SELECT {MEMBER_COLUMNS}
                 FROM members m
                 WHERE m.username = ?1
                   AND m.age = ?2
                 ORDER BY m.id ASC;"
            ),
            params![username, age],
        )
    }

    fn find_username_list(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT username FROM members ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut usernames = Vec::new();
        while let Some(row) = rows.next()? {
            usernames.push(row.get("username")?);
        }
        Ok(usernames)
    }

    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>> {
        let mut stmt = self.conn().prepare(
            "SELECT
                m.id AS id,
                m.username AS username,
                t.name AS team_name
             FROM members m
             INNER JOIN teams t ON t.id = m.team_id
             ORDER BY m.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut dtos = Vec::new();
        while let Some(row) = rows.next()? {
            dtos.push(MemberDto {
                id: row.get("id")?,
                username: row.get("username")?,
                team_name: row.get("team_name")?,
            });
        }
        Ok(dtos)
    }

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        self.query_managed(
            &format!(
                "SELECT {MEMBER_COLUMNS}
                 FROM members m
                 WHERE m.username IN ({placeholders})
                 ORDER BY m.id ASC;"
            ),
            params_from_iter(names),
        )
    }

    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.query_managed(
            &format!(
                "SELECT {MEMBER_COLUMNS}
                 FROM members m
                 WHERE m.username = ?1
                 ORDER BY m.id ASC;"
            ),
            [username],
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.find_optional_by_username(username)
    }

    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        single_result(self.find_list_by_username(username)?)
    }

    fn find_by_age(&self, age: i32, request: &PageRequest) -> RepoResult<Page<Member>> {
        self.page_where(" WHERE m.age = ?1", [age], request)
    }

    fn find_slice_by_age(&self, age: i32, request: &PageRequest) -> RepoResult<Slice<Member>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members m WHERE m.age = ?1{} LIMIT {} OFFSET {};",
            request.sort().order_by_clause("m"),
            u64::from(request.size()) + 1,
            request.offset()
        );
        let rows = self.query_managed(&sql, [age])?;
        Ok(Slice::from_lookahead(rows, request))
    }

    fn find_all_paged(&self, request: &PageRequest) -> RepoResult<Page<Member>> {
        self.page_where("", [], request)
    }

    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize> {
        let updated = self
            .conn()
            .execute("UPDATE members SET age = age + 1 WHERE age >= ?1;", [age])?;
        info!(
            "event=member_bulk_update module=repo status=ok op=age_plus threshold={} rows={} managed={}",
            age,
            updated,
            self.session.managed_count()
        );
        Ok(updated)
    }

    fn find_readonly_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEMBER_COLUMNS}
             FROM members m
             WHERE m.username = ?1
             ORDER BY m.id ASC;"
        ))?;
        let mut rows = stmt.query([username])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let (id, loaded) = parse_member_row(row)?;
            members.push(self.session.cached(id).unwrap_or(loaded));
        }
        single_result(members)
    }

    fn find_lock_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        // A no-op write takes SQLite's RESERVED lock; it is held until the
        // session commits or rolls back.
        if let Err(err) = self.conn().execute(
            "UPDATE members SET username = username WHERE username = ?1;",
            [username],
        ) {
            let err = RepoError::from(err);
            if matches!(err, RepoError::LockTimeout(_)) {
                warn!("event=member_lock module=repo status=timeout error={err}");
            }
            return Err(err);
        }
        info!("event=member_lock module=repo status=acquired mode=write");

        self.find_list_by_username(username)
    }

    fn find_by_team_id(&self, team_id: TeamId) -> RepoResult<Vec<Member>> {
        self.query_managed(
            &format!(
                "SELECT {MEMBER_COLUMNS}
                 FROM members m
                 WHERE m.team_id = ?1
                 ORDER BY m.id ASC;"
            ),
            [team_id],
        )
    }

    fn find_all_matching(&self, query: &MemberQuery) -> RepoResult<Vec<Member>> {
        let mut sql = format!(
            "SELECT {MEMBER_COLUMNS}
             FROM members m
             LEFT JOIN teams t ON t.id = m.team_id
             WHERE 1 = 1"
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(username) = query.username.as_ref() {
            sql.push_str(" AND m.username = ?");
            bind_values.push(Value::Text(username.clone()));
        }

        if let Some(team_name) = query.team_name.as_ref() {
            sql.push_str(" AND t.name = ?");
            bind_values.push(Value::Text(team_name.clone()));
        }

        if let Some(age) = query.age_greater_than {
            sql.push_str(" AND m.age > ?");
            bind_values.push(Value::Integer(i64::from(age)));
        }

        sql.push_str(" ORDER BY m.id ASC");
        self.query_managed(&sql, params_from_iter(bind_values))
    }
}

fn single_result(mut members: Vec<Member>) -> RepoResult<Option<Member>> {
    match members.len() {
        0 | 1 => Ok(members.pop()),
        count => Err(RepoError::NonUniqueResult {
            entity: MEMBER_ENTITY,
            count,
        }),
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<(MemberId, Member)> {
    let id: MemberId = row.get("id")?;
    let member = Member {
        id: Some(id),
        username: row.get("username")?,
        age: row.get("age")?,
        team_id: row.get("team_id")?,
        audit: Some(AuditFields {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            created_by: row.get("created_by")?,
            updated_by: row.get("updated_by")?,
        }),
    };
    member
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("members.id={id}: {err}")))?;
    Ok((id, member))
}

fn parse_joined_team(row: &Row<'_>) -> RepoResult<Option<Team>> {
    let Some(team_id) = row.get::<_, Option<TeamId>>("team_ref_id")? else {
        return Ok(None);
    };
    let name: Option<String> = row.get("team_name")?;
    let name = name
        .ok_or_else(|| RepoError::InvalidData(format!("teams.id={team_id}: missing name")))?;
    Ok(Some(Team {
        id: Some(team_id),
        name,
    }))
}
