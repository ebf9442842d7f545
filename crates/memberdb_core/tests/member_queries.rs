use memberdb_core::{
    open_db_in_memory, Auditor, Member, MemberDto, MemberQuery, MemberRepository, RepoError,
    Session, SqliteMemberRepository, SqliteTeamRepository, Team, TeamId, TeamRepository,
};
use rusqlite::Connection;

fn seed_teams(session: &Session<'_>) -> (TeamId, TeamId) {
    let teams = SqliteTeamRepository::new(session);
    let team_a = teams.save(Team::new("teamA")).unwrap();
    let team_b = teams.save(Team::new("teamB")).unwrap();
    (team_a.id.unwrap(), team_b.id.unwrap())
}

fn open() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn find_by_username_and_age_greater_than_uses_strict_comparison() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::with_age("AAA", 10, None)).unwrap();
    let older = repo.save(Member::with_age("AAA", 20, None)).unwrap();
    repo.save(Member::with_age("BBB", 30, None)).unwrap();

    let result = repo.find_by_username_and_age_greater_than("AAA", 15).unwrap();
    assert_eq!(result, vec![older]);

    assert!(repo
        .find_by_username_and_age_greater_than("AAA", 20)
        .unwrap()
        .is_empty());
}

#[test]
fn find_member_matches_username_and_exact_age() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let target = repo.save(Member::with_age("AAA", 10, None)).unwrap();
    repo.save(Member::with_age("AAA", 20, None)).unwrap();

    assert_eq!(repo.find_member("AAA", 10).unwrap(), vec![target]);
    assert!(repo.find_member("AAA", 11).unwrap().is_empty());
}

#[test]
fn find_by_names_returns_members_in_the_set() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::new("AAA")).unwrap();
    repo.save(Member::new("BBB")).unwrap();
    repo.save(Member::new("CCC")).unwrap();

    let names = vec!["AAA".to_string(), "CCC".to_string(), "ZZZ".to_string()];
    let usernames: Vec<String> = repo
        .find_by_names(&names)
        .unwrap()
        .into_iter()
        .map(|member| member.username)
        .collect();
    assert_eq!(usernames, vec!["AAA", "CCC"]);

    assert!(repo.find_by_names(&[]).unwrap().is_empty());
}

#[test]
fn username_list_projects_all_usernames() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::new("AAA")).unwrap();
    repo.save(Member::new("BBB")).unwrap();

    assert_eq!(repo.find_username_list().unwrap(), vec!["AAA", "BBB"]);
}

#[test]
fn single_result_finders_reject_duplicates_and_multi_result_finder_returns_all() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::with_age("AAA", 10, None)).unwrap();
    repo.save(Member::with_age("AAA", 20, None)).unwrap();

    assert!(matches!(
        repo.find_by_username("AAA").unwrap_err(),
        RepoError::NonUniqueResult {
            entity: "member",
            count: 2
        }
    ));
    assert!(matches!(
        repo.find_optional_by_username("AAA").unwrap_err(),
        RepoError::NonUniqueResult { count: 2, .. }
    ));
    assert_eq!(repo.find_list_by_username("AAA").unwrap().len(), 2);
}

#[test]
fn single_result_finders_return_absent_or_the_only_match() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let repo = SqliteMemberRepository::new(&session);

    let only = repo.save(Member::with_age("AAA", 10, None)).unwrap();

    assert_eq!(repo.find_by_username("AAA").unwrap(), Some(only.clone()));
    assert_eq!(repo.find_optional_by_username("AAA").unwrap(), Some(only));
    assert_eq!(repo.find_by_username("nobody").unwrap(), None);
    assert_eq!(repo.find_optional_by_username("nobody").unwrap(), None);
    assert!(repo.find_list_by_username("nobody").unwrap().is_empty());
}

#[test]
fn member_dto_projection_joins_team_name() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let (team_a, _) = seed_teams(&session);
    let repo = SqliteMemberRepository::new(&session);

    let member = repo.save(Member::with_age("AAA", 10, Some(team_a))).unwrap();
    repo.save(Member::new("no team")).unwrap();

    let dtos = repo.find_member_dto().unwrap();
    assert_eq!(
        dtos,
        vec![MemberDto::new(
            member.id.unwrap(),
            "AAA",
            Some("teamA".to_string())
        )]
    );
}

#[test]
fn fetch_join_variants_load_teams_in_one_query() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let (team_a, team_b) = seed_teams(&session);
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::with_age("member1", 10, Some(team_a))).unwrap();
    repo.save(Member::with_age("member2", 20, Some(team_b))).unwrap();
    repo.save(Member::with_age("member3", 30, None)).unwrap();
    session.clear();

    let all = repo.find_all_with_team().unwrap();
    let team_names: Vec<Option<String>> = all
        .iter()
        .map(|item| item.team.as_ref().map(|team| team.name.clone()))
        .collect();
    assert_eq!(
        team_names,
        vec![Some("teamA".to_string()), Some("teamB".to_string()), None]
    );
    assert_eq!(session.managed_count(), 3);

    let fetched = repo.find_member_fetch().unwrap();
    assert_eq!(fetched.len(), 2);
    assert!(fetched
        .iter()
        .all(|item| item.team.as_ref().map(|team| team.id) == Some(item.member.team_id)));
}

#[test]
fn members_of_a_team_are_found_through_the_foreign_key() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let (team_a, team_b) = seed_teams(&session);
    let repo = SqliteMemberRepository::new(&session);

    let mut member1 = repo.save(Member::with_age("member1", 10, Some(team_a))).unwrap();
    repo.save(Member::with_age("member2", 15, Some(team_a))).unwrap();
    repo.save(Member::with_age("member3", 20, Some(team_b))).unwrap();

    assert_eq!(repo.find_by_team_id(team_a).unwrap().len(), 2);

    member1.change_team(Some(team_b));
    repo.save(member1).unwrap();
    assert_eq!(repo.find_by_team_id(team_a).unwrap().len(), 1);
    assert_eq!(repo.find_by_team_id(team_b).unwrap().len(), 2);
}

#[test]
fn find_all_matching_combines_optional_filters() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let (team_a, team_b) = seed_teams(&session);
    let repo = SqliteMemberRepository::new(&session);

    repo.save(Member::with_age("m1", 0, Some(team_a))).unwrap();
    let m2 = repo.save(Member::with_age("m2", 20, Some(team_a))).unwrap();
    repo.save(Member::with_age("m1", 30, Some(team_b))).unwrap();
    repo.save(Member::with_age("m3", 40, None)).unwrap();

    let by_team = MemberQuery {
        team_name: Some("teamA".to_string()),
        ..MemberQuery::default()
    };
    assert_eq!(repo.find_all_matching(&by_team).unwrap().len(), 2);

    let by_team_and_age = MemberQuery {
        team_name: Some("teamA".to_string()),
        age_greater_than: Some(10),
        ..MemberQuery::default()
    };
    assert_eq!(repo.find_all_matching(&by_team_and_age).unwrap(), vec![m2]);

    let by_username = MemberQuery {
        username: Some("m1".to_string()),
        ..MemberQuery::default()
    };
    assert_eq!(repo.find_all_matching(&by_username).unwrap().len(), 2);

    assert_eq!(
        repo.find_all_matching(&MemberQuery::default())
            .unwrap()
            .len(),
        4
    );
}

#[test]
fn entity_graph_survives_a_cleared_session() {
    let mut conn = open();
    let session = Session::begin(&mut conn, Auditor::named("tester")).unwrap();
    let (team_a, team_b) = seed_teams(&session);
    let repo = SqliteMemberRepository::new(&session);

    for (name, age, team) in [
        ("member1", 10, team_a),
        ("member2", 15, team_a),
        ("member3", 20, team_b),
        ("member4", 27, team_b),
    ] {
        repo.save(Member::with_age(name, age, Some(team))).unwrap();
    }
    session.clear();

    let names: Vec<String> = repo
        .find_all_with_team()
        .unwrap()
        .into_iter()
        .filter_map(|item| item.team.map(|team| team.name))
        .collect();
    assert_eq!(names, vec!["teamA", "teamA", "teamB", "teamB"]);
}
