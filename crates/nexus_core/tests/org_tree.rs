use nexus_core::{Member, OrgNode, OrgNodeSpec, OrgRow, OrgTreeError, OrgTreeView};

fn member(id: &str, position: &str) -> Member {
    Member::new(id, format!("Name {id}"), position)
}

/// board
/// ├── tech (lead: cto) members: dev1, dev2
/// │   └── web  members: web1
/// └── events  members: ev1
fn club_tree() -> OrgNode {
    let web = OrgNode::new("web", "Web", None, vec![member("web1", "Frontend")], vec![]).unwrap();
    let tech = OrgNode::new(
        "tech",
        "Technology",
        Some(member("cto", "CTO")),
        vec![member("dev1", "Developer"), member("dev2", "Developer")],
        vec![web],
    )
    .unwrap();
    let events = OrgNode::new("events", "Events", None, vec![member("ev1", "Planner")], vec![])
        .unwrap();
    OrgNode::new(
        "board",
        "Board",
        Some(member("pres", "President")),
        vec![],
        vec![tech, events],
    )
    .unwrap()
}

fn row_labels(view: &OrgTreeView) -> Vec<String> {
    view.visible_rows()
        .iter()
        .map(|row| match row {
            OrgRow::Node { node, .. } => format!("node:{}", node.id()),
            OrgRow::Lead { member, .. } => format!("lead:{}", member.id),
            OrgRow::Member { member, .. } => format!("member:{}", member.id),
        })
        .collect()
}

#[test]
fn default_expansion_shows_first_level() {
    let view = OrgTreeView::new(club_tree(), ["board"]);

    assert_eq!(
        row_labels(&view),
        ["node:board", "lead:pres", "node:tech", "node:events"]
    );
    assert_eq!(view.visible_rows()[2].depth(), 1);
}

#[test]
fn expanded_rows_follow_declared_order() {
    let view = OrgTreeView::new(club_tree(), ["board", "tech", "web"]);

    assert_eq!(
        row_labels(&view),
        [
            "node:board",
            "lead:pres",
            "node:tech",
            "lead:cto",
            "member:dev1",
            "member:dev2",
            "node:web",
            "member:web1",
            "node:events",
        ]
    );
}

#[test]
fn toggle_twice_restores_state() {
    let mut view = OrgTreeView::new(club_tree(), ["board"]);
    let before = row_labels(&view);

    assert!(view.toggle("tech").unwrap());
    assert!(!view.toggle("tech").unwrap());
    assert_eq!(row_labels(&view), before);
}

#[test]
fn siblings_expand_independently() {
    let mut view = OrgTreeView::new(club_tree(), ["board"]);
    view.toggle("tech").unwrap();

    assert!(view.is_expanded("tech"));
    assert!(!view.is_expanded("events"));

    view.toggle("events").unwrap();
    view.toggle("events").unwrap();
    assert!(view.is_expanded("tech"));
}

#[test]
fn collapsing_parent_keeps_descendant_state() {
    let mut view = OrgTreeView::new(club_tree(), ["board", "tech", "web"]);
    view.toggle("tech").unwrap();

    assert!(!row_labels(&view).contains(&"node:web".to_string()));
    assert!(view.is_expanded("web"));

    view.toggle("tech").unwrap();
    assert!(row_labels(&view).contains(&"member:web1".to_string()));
}

#[test]
fn selection_does_not_change_expansion() {
    let mut view = OrgTreeView::new(club_tree(), ["board"]);
    let before = row_labels(&view);

    let selected = view.select("web1").unwrap();
    assert_eq!(selected.position, "Frontend");
    assert_eq!(view.selected().unwrap().id, "web1");
    assert_eq!(row_labels(&view), before);

    view.clear_selection();
    assert!(view.selected().is_none());
}

#[test]
fn unknown_ids_are_reported() {
    let mut view = OrgTreeView::new(club_tree(), ["board", "ghost"]);

    assert!(!view.is_expanded("ghost"));
    assert_eq!(
        view.toggle("ghost"),
        Err(OrgTreeError::NodeNotFound("ghost".to_string()))
    );
    assert!(matches!(
        view.select("nobody"),
        Err(OrgTreeError::MemberNotFound(_))
    ));
}

#[test]
fn malformed_trees_are_rejected() {
    assert_eq!(
        OrgNode::new("empty", "Empty", None, vec![], vec![]),
        Err(OrgTreeError::EmptyNode("empty".to_string()))
    );

    let twice = OrgNode::new(
        "team",
        "Team",
        Some(member("a", "Lead")),
        vec![member("a", "Member")],
        vec![],
    );
    assert_eq!(twice, Err(OrgTreeError::DuplicateMemberId("a".to_string())));

    let child = OrgNode::new("dup", "Child", None, vec![member("x", "X")], vec![]).unwrap();
    let parent = OrgNode::new("dup", "Parent", None, vec![], vec![child]);
    assert_eq!(parent, Err(OrgTreeError::DuplicateNodeId("dup".to_string())));
}

#[test]
fn nested_shape_roundtrip_rebuilds_same_tree() {
    let tree = club_tree();
    let json = serde_json::to_string(&OrgNodeSpec::from(&tree)).unwrap();
    let rebuilt = serde_json::from_str::<OrgNodeSpec>(&json)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(rebuilt, tree);
    assert!(rebuilt.find_node("web").is_some());
}
