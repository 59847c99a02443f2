use nexus_core::db::open_db_in_memory;
use nexus_core::model::member::MemberValidationError;
use nexus_core::{
    Member, OrgNode, OrgTreeError, RepoError, SqliteTeamRepository, TeamRepository, TeamService,
    TeamServiceError,
};

fn member(id: &str, year: &str) -> Member {
    let mut member = Member::new(id, format!("Name {id}"), "Member");
    member.roster_year = Some(year.to_string());
    member
}

#[test]
fn roster_filters_by_season_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));
    team.add_member(&member("b", "2024-25")).unwrap();
    team.add_member(&member("old", "2023-24")).unwrap();
    team.add_member(&member("a", "2024-25")).unwrap();

    let current: Vec<String> = team
        .roster(Some("2024-25"))
        .unwrap()
        .into_iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(current, ["b", "a"]);
    assert_eq!(team.roster(None).unwrap().len(), 3);
    assert_eq!(team.roster(Some("  ")).unwrap().len(), 3);
    assert_eq!(team.roster_years().unwrap(), ["2024-25", "2023-24"]);
}

#[test]
fn member_writes_validate_and_report_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));

    let mut bad_email = member("x", "2024-25");
    bad_email.email = Some("not-an-email".to_string());
    assert!(matches!(
        team.add_member(&bad_email),
        Err(TeamServiceError::Validation(MemberValidationError::InvalidEmail(_)))
    ));

    let bad_year = member("y", "2024");
    assert!(matches!(
        team.add_member(&bad_year),
        Err(TeamServiceError::Validation(MemberValidationError::InvalidRosterYear(_)))
    ));

    assert!(matches!(
        team.update_member(&member("ghost", "2024-25")),
        Err(TeamServiceError::MemberNotFound(_))
    ));
    assert!(matches!(
        team.remove_member("ghost"),
        Err(TeamServiceError::MemberNotFound(_))
    ));
    assert!(team.roster(None).unwrap().is_empty());
}

#[test]
fn update_member_replaces_profile() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));
    team.add_member(&member("m", "2024-25")).unwrap();

    let mut updated = member("m", "2024-25");
    updated.position = "Treasurer".to_string();
    updated.github = Some("https://github.com/m".to_string());
    team.update_member(&updated).unwrap();

    assert_eq!(team.member("m").unwrap(), updated);
}

#[test]
fn missing_org_tree_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));

    assert!(matches!(team.org_tree(), Err(TeamServiceError::OrgTreeMissing)));
}

#[test]
fn org_tree_roundtrip_preserves_order_and_body_shape() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));

    let design = OrgNode::new(
        "design",
        "Design",
        None,
        vec![member("d2", "2024-25"), member("d1", "2024-25")],
        vec![],
    )
    .unwrap();
    let web = OrgNode::new("web", "Web", None, vec![member("w1", "2024-25")], vec![]).unwrap();
    let tech = OrgNode::new(
        "tech",
        "Technology",
        Some(member("cto", "2024-25")),
        vec![member("t1", "2024-25")],
        vec![web],
    )
    .unwrap();
    let root = OrgNode::new(
        "board",
        "Board",
        Some(member("pres", "2024-25")),
        vec![],
        vec![tech, design],
    )
    .unwrap();

    team.publish_org_tree(&root).unwrap();
    let loaded = team.org_tree().unwrap();
    assert_eq!(loaded, root);

    let child_ids: Vec<&str> = loaded.subdepartments().iter().map(|node| node.id()).collect();
    assert_eq!(child_ids, ["tech", "design"]);
    assert_eq!(team.roster(None).unwrap().len(), 6);
}

#[test]
fn republishing_replaces_previous_tree() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTeamRepository::new(&conn);

    let first = OrgNode::new("board", "Board", None, vec![member("a", "2024-25")], vec![]).unwrap();
    repo.replace_org_tree(&first).unwrap();

    let second = OrgNode::new("council", "Council", None, vec![member("b", "2024-25")], vec![])
        .unwrap();
    repo.replace_org_tree(&second).unwrap();

    let loaded = repo.get_org_tree().unwrap();
    assert_eq!(loaded.id(), "council");
    assert!(loaded.find_member("a").is_none());
    assert!(repo.get_member("a").unwrap().is_some());
}

#[test]
fn deleting_member_removes_membership() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTeamRepository::new(&conn);
    let root = OrgNode::new(
        "board",
        "Board",
        None,
        vec![member("a", "2024-25"), member("b", "2024-25")],
        vec![],
    )
    .unwrap();
    repo.replace_org_tree(&root).unwrap();

    repo.delete_member("a").unwrap();
    let loaded = repo.get_org_tree().unwrap();
    assert_eq!(loaded.members().len(), 1);
    assert!(matches!(
        repo.delete_member("a"),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn deleting_last_member_of_leaf_department_is_refused() {
    let conn = open_db_in_memory().unwrap();
    let team = TeamService::new(SqliteTeamRepository::new(&conn));
    let design = OrgNode::new("design", "Design", None, vec![member("d1", "2024-25")], vec![])
        .unwrap();
    let root = OrgNode::new(
        "board",
        "Board",
        None,
        vec![member("p", "2024-25")],
        vec![design],
    )
    .unwrap();
    team.publish_org_tree(&root).unwrap();

    assert!(matches!(
        team.remove_member("d1"),
        Err(TeamServiceError::OrgTree(OrgTreeError::EmptyNode(node))) if node == "design"
    ));
    assert_eq!(team.org_tree().unwrap(), root);
    assert!(team.member("d1").is_ok());

    // The board keeps its subdepartment, so its own last member may go.
    team.remove_member("p").unwrap();
    let loaded = team.org_tree().unwrap();
    assert!(loaded.members().is_empty());
    assert_eq!(loaded.subdepartments().len(), 1);
}
