//! Interactive org tree state: expansion, selection and flattened rows.
//!
//! # Invariants
//! - Expansion is a set of node ids; collapsing a parent keeps descendant state.
//! - Selecting a member never changes expansion.

use crate::model::member::{Member, MemberId};
use crate::model::org::{OrgNode, OrgNodeId, OrgTreeError};
use std::collections::HashSet;

/// One rendered line of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRow<'a> {
    Node {
        node: &'a OrgNode,
        depth: usize,
        expanded: bool,
    },
    Lead {
        member: &'a Member,
        depth: usize,
    },
    Member {
        member: &'a Member,
        depth: usize,
    },
}

impl OrgRow<'_> {
    pub fn depth(&self) -> usize {
        match self {
            Self::Node { depth, .. } | Self::Lead { depth, .. } | Self::Member { depth, .. } => {
                *depth
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrgTreeView {
    root: OrgNode,
    expanded: HashSet<OrgNodeId>,
    selected: Option<MemberId>,
}

impl OrgTreeView {
    /// Builds the view with `default_expanded` node ids open.
    ///
    /// Ids not present in the tree are ignored.
    pub fn new<I, S>(root: OrgNode, default_expanded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OrgNodeId>,
    {
        let expanded = default_expanded
            .into_iter()
            .map(Into::into)
            .filter(|id: &OrgNodeId| root.find_node(id).is_some())
            .collect();
        Self {
            root,
            expanded,
            selected: None,
        }
    }

    pub fn root(&self) -> &OrgNode {
        &self.root
    }

    /// Flips one node's expansion. Returns whether it is expanded afterwards.
    pub fn toggle(&mut self, node_id: &str) -> Result<bool, OrgTreeError> {
        if self.root.find_node(node_id).is_none() {
            return Err(OrgTreeError::NodeNotFound(node_id.to_string()));
        }
        if self.expanded.remove(node_id) {
            return Ok(false);
        }
        self.expanded.insert(node_id.to_string());
        Ok(true)
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expanded.contains(node_id)
    }

    /// Selects a member for the detail panel.
    pub fn select(&mut self, member_id: &str) -> Result<&Member, OrgTreeError> {
        let member = self
            .root
            .find_member(member_id)
            .ok_or_else(|| OrgTreeError::MemberNotFound(member_id.to_string()))?;
        self.selected = Some(member.id.clone());
        Ok(member)
    }

    pub fn selected(&self) -> Option<&Member> {
        self.selected
            .as_deref()
            .and_then(|member_id| self.root.find_member(member_id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Depth-first rows: node, lead, members, then subdepartments.
    ///
    /// Children of collapsed nodes are omitted.
    pub fn visible_rows(&self) -> Vec<OrgRow<'_>> {
        let mut rows = Vec::new();
        self.push_rows(&self.root, 0, &mut rows);
        rows
    }

    fn push_rows<'a>(&'a self, node: &'a OrgNode, depth: usize, rows: &mut Vec<OrgRow<'a>>) {
        let expanded = self.is_expanded(node.id());
        rows.push(OrgRow::Node {
            node,
            depth,
            expanded,
        });
        if !expanded {
            return;
        }
        if let Some(member) = node.lead() {
            rows.push(OrgRow::Lead {
                member,
                depth: depth + 1,
            });
        }
        for member in node.members() {
            rows.push(OrgRow::Member {
                member,
                depth: depth + 1,
            });
        }
        for child in node.subdepartments() {
            self.push_rows(child, depth + 1, rows);
        }
    }
}
