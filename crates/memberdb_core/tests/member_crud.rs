use memberdb_core::db::migrations::latest_version;
use memberdb_core::{
    open_db_in_memory, Auditor, Member, MemberRepository, MemberService, RepoError, Session,
    SqliteMemberRepository, SqliteTeamRepository, Team, TeamRepository, ValidationError,
};
use rusqlite::Connection;
use std::thread::sleep;
use std::time::Duration;

#[test]
fn save_assigns_identity_and_returns_same_entity() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let saved = repo.save(Member::new("memberA")).unwrap();

    let id = saved.id.unwrap();
    assert_eq!(repo.find_by_id(id).unwrap(), Some(saved.clone()));
    assert_eq!(saved.username, "memberA");
    assert!(session.is_managed(id));
}

#[test]
fn saved_member_reads_back_equal_from_a_new_session() {
    let mut conn = open_db_in_memory().unwrap();
    let saved = {
        let session = Session::begin(&mut conn, Auditor::named("writer")).unwrap();
        let repo = SqliteMemberRepository::new(&session);
        let saved = repo.save(Member::with_age("member1", 10, None)).unwrap();
        session.commit().unwrap();
        saved
    };

    let session = Session::begin(&mut conn, Auditor::named("reader")).unwrap();
    let repo = SqliteMemberRepository::new(&session);
    let loaded = repo.find_by_id(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn basic_crud_keeps_count_in_sync() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let member1 = repo.save(Member::new("member1")).unwrap();
    let member2 = repo.save(Member::new("member2")).unwrap();
    let member3 = repo.save(Member::new("member3")).unwrap();

    assert_eq!(repo.find(member1.id.unwrap()).unwrap(), member1);
    assert_eq!(repo.find_all().unwrap().len() as u64, repo.count().unwrap());
    assert_eq!(repo.count().unwrap(), 3);

    repo.delete(&member1).unwrap();
    repo.delete(&member2).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.find_all().unwrap(), vec![member3]);
    assert!(!session.is_managed(member1.id.unwrap()));
}

#[test]
fn missing_id_is_empty_for_find_by_id_and_not_found_for_find() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    assert_eq!(repo.find_by_id(404).unwrap(), None);
    let err = repo.find(404).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "member",
            id: 404
        }
    ));
}

#[test]
fn delete_reports_missing_and_transient_members() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let transient = Member::new("never saved");
    assert!(matches!(
        repo.delete(&transient).unwrap_err(),
        RepoError::TransientEntity("member")
    ));

    let saved = repo.save(Member::new("member1")).unwrap();
    repo.delete(&saved).unwrap();
    assert!(matches!(
        repo.delete(&saved).unwrap_err(),
        RepoError::NotFound { id, .. } if Some(id) == saved.id
    ));
}

#[test]
fn save_with_identity_updates_existing_row() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let mut member = repo.save(Member::with_age("member1", 10, None)).unwrap();
    member.username = "memberUpdate".to_string();
    member.age = 11;
    let updated = repo.save(member.clone()).unwrap();

    assert_eq!(updated.id, member.id);
    assert_eq!(repo.count().unwrap(), 1);

    session.clear();
    let reloaded = repo.find(member.id.unwrap()).unwrap();
    assert_eq!(reloaded.username, "memberUpdate");
    assert_eq!(reloaded.age, 11);
}

#[test]
fn save_with_unknown_identity_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let mut ghost = Member::new("ghost");
    ghost.id = Some(77);
    assert!(matches!(
        repo.save(ghost).unwrap_err(),
        RepoError::NotFound { id: 77, .. }
    ));
}

#[test]
fn audit_fields_are_stamped_on_insert_and_update() {
    let mut conn = open_db_in_memory().unwrap();
    let created = {
        let session = Session::begin(&mut conn, Auditor::named("creator")).unwrap();
        let repo = SqliteMemberRepository::new(&session);
        let created = repo.save(Member::new("member1")).unwrap();
        session.commit().unwrap();
        created
    };
    let created_audit = created.audit.clone().unwrap();
    assert_eq!(created_audit.created_at, created_audit.updated_at);
    assert_eq!(created_audit.created_by, "creator");
    assert_eq!(created_audit.updated_by, "creator");

    sleep(Duration::from_millis(20));

    let session = Session::begin(&mut conn, Auditor::named("editor")).unwrap();
    let repo = SqliteMemberRepository::new(&session);
    let mut member = repo.find(created.id.unwrap()).unwrap();
    member.username = "memberUpdate".to_string();
    repo.save(member).unwrap();
    session.clear();

    let found = repo.find(created.id.unwrap()).unwrap();
    let audit = found.audit.unwrap();
    assert_eq!(found.username, "memberUpdate");
    assert_eq!(audit.created_at, created_audit.created_at);
    assert_eq!(audit.created_by, "creator");
    assert_eq!(audit.updated_by, "editor");
    assert!(audit.updated_at > audit.created_at);
}

#[test]
fn validation_failure_blocks_save() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    assert!(matches!(
        repo.save(Member::new("  ")).unwrap_err(),
        RepoError::Validation(ValidationError::BlankUsername)
    ));
    assert!(matches!(
        repo.save(Member::with_age("member1", -3, None)).unwrap_err(),
        RepoError::Validation(ValidationError::NegativeAge(-3))
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn unknown_team_reference_is_a_constraint_violation() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let err = repo
        .save(Member::with_age("member1", 10, Some(999)))
        .unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)));
}

#[test]
fn rollback_discards_writes() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
        let teams = SqliteTeamRepository::new(&session);
        let members = SqliteMemberRepository::new(&session);
        let team = teams.save(Team::new("teamA")).unwrap();
        members
            .save(Member::with_age("member1", 10, team.id))
            .unwrap();
        session.rollback().unwrap();
    }

    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let members = SqliteMemberRepository::new(&session);
    let teams = SqliteTeamRepository::new(&session);
    assert_eq!(members.count().unwrap(), 0);
    assert_eq!(teams.count().unwrap(), 0);
}

#[test]
fn dropped_session_rolls_back() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
        let repo = SqliteMemberRepository::new(&session);
        repo.save(Member::new("member1")).unwrap();
    }

    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn service_registers_and_looks_up_members() {
    let mut conn = open_db_in_memory().unwrap();
    let session = Session::begin(&mut conn, Auditor::anonymous()).unwrap();
    let service = MemberService::new(SqliteMemberRepository::new(&session));

    let member = service.register("member1", 0, None).unwrap();
    let id = member.id.unwrap();
    assert_eq!(service.username_of(id).unwrap(), "member1");
    assert!(matches!(
        service.username_of(id + 1).unwrap_err(),
        RepoError::NotFound { .. }
    ));
    assert_eq!(
        member.audit.unwrap().created_by,
        session.auditor().name().to_string()
    );
}

#[test]
fn session_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match Session::begin(&mut conn, Auditor::named("tester")) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    };
}

#[test]
fn session_rejects_connection_missing_required_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE teams (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE members (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL,
            age INTEGER NOT NULL
         );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = Session::begin(&mut conn, Auditor::named("tester"));
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "members",
            column: "team_id"
        })
    ));
}
