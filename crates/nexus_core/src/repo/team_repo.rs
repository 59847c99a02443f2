//! Team roster and org tree repository.
//!
//! # Responsibility
//! - Persist members with their roster season.
//! - Persist the department tree and rebuild it as an owned `OrgNode`.
//!
//! # Invariants
//! - Member listing order is insertion order (`seq ASC`).
//! - Org children are listed by `sort_order ASC`.
//! - Exactly one root node (`parent_id IS NULL`) exists when a tree is stored.

use crate::model::member::{Member, MemberId};
use crate::model::org::{OrgNode, OrgNodeId, OrgTreeError};
use crate::repo::content_repo::{atomic_write, conflict_or_db, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    name,
    position,
    roster_year,
    bio,
    email,
    linkedin,
    github,
    portrait
FROM members";

/// Data provider contract for the team directory.
pub trait TeamRepository {
    /// Lists members, optionally restricted to one roster season.
    fn list_members(&self, roster_year: Option<&str>) -> RepoResult<Vec<Member>>;
    fn get_member(&self, id: &str) -> RepoResult<Option<Member>>;
    fn create_member(&self, member: &Member) -> RepoResult<()>;
    fn update_member(&self, member: &Member) -> RepoResult<()>;
    /// Refuses to strand a department with no members and no subdepartments.
    fn delete_member(&self, id: &str) -> RepoResult<()>;
    /// Distinct roster seasons, newest first.
    fn list_roster_years(&self) -> RepoResult<Vec<String>>;
    /// Loads the full department tree.
    fn get_org_tree(&self) -> RepoResult<OrgNode>;
    /// Replaces the stored tree, upserting every member it references.
    fn replace_org_tree(&self, root: &OrgNode) -> RepoResult<()>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn list_members(&self, roster_year: Option<&str>) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE (?1 IS NULL OR roster_year = ?1)
             ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([roster_year])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn get_member(&self, id: &str) -> RepoResult<Option<Member>> {
        let member = self
            .conn
            .query_row(
                &format!("{MEMBER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_member_row(row)),
            )
            .optional()?;
        member.transpose()
    }

    fn create_member(&self, member: &Member) -> RepoResult<()> {
        member.validate()?;
        insert_member(self.conn, member)
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        member.validate()?;
        let changed = self.conn.execute(
            "UPDATE members
             SET
                name = ?2,
                position = ?3,
                roster_year = ?4,
                bio = ?5,
                email = ?6,
                linkedin = ?7,
                github = ?8,
                portrait = ?9
             WHERE id = ?1;",
            member_params(member),
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("member", member.id.as_str()));
        }
        Ok(())
    }

    fn delete_member(&self, id: &str) -> RepoResult<()> {
        atomic_write(self.conn, |tx| {
            // A node whose only content is this member would be left empty.
            let stranded: Option<OrgNodeId> = tx
                .query_row(
                    "SELECT m.node_id
                     FROM org_node_members m
                     WHERE m.member_id = ?1
                       AND NOT EXISTS (
                           SELECT 1 FROM org_node_members o
                           WHERE o.node_id = m.node_id AND o.member_id <> ?1
                       )
                       AND NOT EXISTS (
                           SELECT 1 FROM org_nodes c WHERE c.parent_id = m.node_id
                       );",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(node_id) = stranded {
                return Err(OrgTreeError::EmptyNode(node_id).into());
            }

            let changed = tx.execute("DELETE FROM members WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found("member", id));
            }
            Ok(())
        })
    }

    fn list_roster_years(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT roster_year
             FROM members
             WHERE roster_year IS NOT NULL
             ORDER BY roster_year DESC;",
        )?;
        let years = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(years)
    }

    fn get_org_tree(&self) -> RepoResult<OrgNode> {
        let rows = load_node_rows(self.conn)?;
        let mut members_by_node = load_node_members(self.conn)?;
        let mut members_by_id = HashMap::new();
        for member in self.list_members(None)? {
            members_by_id.insert(member.id.clone(), member);
        }

        let mut children: HashMap<Option<OrgNodeId>, Vec<NodeRow>> = HashMap::new();
        for row in rows {
            children.entry(row.parent_id.clone()).or_default().push(row);
        }

        let mut roots = children.remove(&None).unwrap_or_default();
        let root = match roots.len() {
            0 => return Err(RepoError::not_found("org tree", "root")),
            1 => roots.remove(0),
            count => {
                return Err(RepoError::InvalidData(format!(
                    "org tree has {count} root nodes, expected 1"
                )))
            }
        };

        let tree = build_node(root, &mut children, &mut members_by_node, &members_by_id)?;
        if let Some(orphan_parent) = children.keys().flatten().next() {
            return Err(RepoError::InvalidData(format!(
                "org node parent `{orphan_parent}` is unreachable from root"
            )));
        }
        Ok(tree)
    }

    fn replace_org_tree(&self, root: &OrgNode) -> RepoResult<()> {
        atomic_write(self.conn, |tx| {
            tx.execute("DELETE FROM org_nodes;", [])?;

            let mut sort_orders: HashMap<Option<&str>, i64> = HashMap::new();
            let mut stack: Vec<(Option<&str>, &OrgNode)> = vec![(None, root)];
            while let Some((parent_id, node)) = stack.pop() {
                let sort_order = {
                    let next = sort_orders.entry(parent_id).or_insert(0);
                    let current = *next;
                    *next += 1;
                    current
                };
                store_node(tx, parent_id, node, sort_order)?;
                // Reverse so siblings pop in declared order.
                for child in node.subdepartments().iter().rev() {
                    stack.push((Some(node.id()), child));
                }
            }
            Ok(())
        })
    }
}

struct NodeRow {
    node_id: OrgNodeId,
    parent_id: Option<OrgNodeId>,
    name: String,
    lead_member_id: Option<MemberId>,
}

fn store_node(
    conn: &Connection,
    parent_id: Option<&str>,
    node: &OrgNode,
    sort_order: i64,
) -> RepoResult<()> {
    if let Some(lead) = node.lead() {
        upsert_member(conn, lead)?;
    }
    conn.execute(
        "INSERT INTO org_nodes (node_id, parent_id, name, lead_member_id, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            node.id(),
            parent_id,
            node.name(),
            node.lead().map(|lead| lead.id.as_str()),
            sort_order,
        ],
    )
    .map_err(|err| conflict_or_db(err, "org node", node.id()))?;

    for (position, member) in node.members().iter().enumerate() {
        upsert_member(conn, member)?;
        conn.execute(
            "INSERT INTO org_node_members (node_id, member_id, sort_order)
             VALUES (?1, ?2, ?3);",
            params![node.id(), member.id.as_str(), position as i64],
        )
        .map_err(|err| conflict_or_db(err, "org membership", member.id.as_str()))?;
    }
    Ok(())
}

fn build_node(
    row: NodeRow,
    children: &mut HashMap<Option<OrgNodeId>, Vec<NodeRow>>,
    members_by_node: &mut HashMap<OrgNodeId, Vec<MemberId>>,
    members_by_id: &HashMap<MemberId, Member>,
) -> RepoResult<OrgNode> {
    let lookup = |member_id: &str| {
        members_by_id.get(member_id).cloned().ok_or_else(|| {
            RepoError::InvalidData(format!(
                "org tree references unknown member `{member_id}`"
            ))
        })
    };

    let lead = row
        .lead_member_id
        .as_deref()
        .map(|member_id| lookup(member_id))
        .transpose()?;
    let members = members_by_node
        .remove(&row.node_id)
        .unwrap_or_default()
        .iter()
        .map(|member_id| lookup(member_id))
        .collect::<RepoResult<Vec<_>>>()?;

    let subdepartments = children
        .remove(&Some(row.node_id.clone()))
        .unwrap_or_default()
        .into_iter()
        .map(|child| build_node(child, children, members_by_node, members_by_id))
        .collect::<RepoResult<Vec<_>>>()?;

    OrgNode::new(row.node_id, row.name, lead, members, subdepartments).map_err(|err| {
        RepoError::InvalidData(format!("stored org tree is malformed: {err}"))
    })
}

fn load_node_rows(conn: &Connection) -> RepoResult<Vec<NodeRow>> {
    let mut stmt = conn.prepare(
        "SELECT node_id, parent_id, name, lead_member_id
         FROM org_nodes
         ORDER BY sort_order ASC, node_id ASC;",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(NodeRow {
                node_id: row.get("node_id")?,
                parent_id: row.get("parent_id")?,
                name: row.get("name")?,
                lead_member_id: row.get("lead_member_id")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn load_node_members(conn: &Connection) -> RepoResult<HashMap<OrgNodeId, Vec<MemberId>>> {
    let mut stmt = conn.prepare(
        "SELECT node_id, member_id
         FROM org_node_members
         ORDER BY node_id ASC, sort_order ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut by_node: HashMap<OrgNodeId, Vec<MemberId>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let node_id: String = row.get(0)?;
        by_node.entry(node_id).or_default().push(row.get(1)?);
    }
    Ok(by_node)
}

fn insert_member(conn: &Connection, member: &Member) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO members (
            id,
            name,
            position,
            roster_year,
            bio,
            email,
            linkedin,
            github,
            portrait
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        member_params(member),
    )
    .map_err(|err| conflict_or_db(err, "member", &member.id))?;
    Ok(())
}

fn upsert_member(conn: &Connection, member: &Member) -> RepoResult<()> {
    member.validate()?;
    conn.execute(
        "INSERT INTO members (
            id,
            name,
            position,
            roster_year,
            bio,
            email,
            linkedin,
            github,
            portrait
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            position = excluded.position,
            roster_year = COALESCE(excluded.roster_year, members.roster_year),
            bio = excluded.bio,
            email = excluded.email,
            linkedin = excluded.linkedin,
            github = excluded.github,
            portrait = excluded.portrait;",
        member_params(member),
    )?;
    Ok(())
}

fn member_params(member: &Member) -> [&dyn rusqlite::ToSql; 9] {
    [
        &member.id,
        &member.name,
        &member.position,
        &member.roster_year,
        &member.bio,
        &member.email,
        &member.linkedin,
        &member.github,
        &member.portrait,
    ]
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    Ok(Member {
        id: row.get("id")?,
        name: row.get("name")?,
        position: row.get("position")?,
        roster_year: row.get("roster_year")?,
        bio: row.get("bio")?,
        email: row.get("email")?,
        linkedin: row.get("linkedin")?,
        github: row.get("github")?,
        portrait: row.get("portrait")?,
    })
}
