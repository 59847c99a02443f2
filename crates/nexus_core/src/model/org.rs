//! Organization tree model.
//!
//! # Responsibility
//! - Represent departments, their leads and members as an owned tree.
//! - Reject malformed shapes at construction time.
//!
//! # Invariants
//! - Every node has members, subdepartments, or both.
//! - Node ids are unique across the whole tree.
//! - A member id appears at most once across the whole tree (lead included).
//! - Children are owned by their parent, so cycles cannot be expressed.

use crate::model::member::{Member, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of an org node (department).
pub type OrgNodeId = String;

/// Tagged node body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgNodeBody {
    Members(Vec<Member>),
    Subdepartments(Vec<OrgNode>),
    Hybrid {
        members: Vec<Member>,
        subdepartments: Vec<OrgNode>,
    },
}

impl OrgNodeBody {
    pub fn members(&self) -> &[Member] {
        match self {
            Self::Members(members) | Self::Hybrid { members, .. } => members.as_slice(),
            Self::Subdepartments(_) => &[],
        }
    }

    pub fn subdepartments(&self) -> &[OrgNode] {
        match self {
            Self::Subdepartments(nodes)
            | Self::Hybrid {
                subdepartments: nodes,
                ..
            } => nodes.as_slice(),
            Self::Members(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgNode {
    id: OrgNodeId,
    name: String,
    lead: Option<Member>,
    body: OrgNodeBody,
}

impl OrgNode {
    /// Builds one node, picking the body variant from what is present.
    pub fn new(
        id: impl Into<OrgNodeId>,
        name: impl Into<String>,
        lead: Option<Member>,
        members: Vec<Member>,
        subdepartments: Vec<OrgNode>,
    ) -> Result<Self, OrgTreeError> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(OrgTreeError::BlankNodeId);
        }
        if name.trim().is_empty() {
            return Err(OrgTreeError::BlankNodeName(id));
        }
        let body = match (members.is_empty(), subdepartments.is_empty()) {
            (true, true) => return Err(OrgTreeError::EmptyNode(id)),
            (false, true) => OrgNodeBody::Members(members),
            (true, false) => OrgNodeBody::Subdepartments(subdepartments),
            (false, false) => OrgNodeBody::Hybrid {
                members,
                subdepartments,
            },
        };
        let node = Self {
            id,
            name,
            lead,
            body,
        };
        node.check_unique_ids()?;
        Ok(node)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lead(&self) -> Option<&Member> {
        self.lead.as_ref()
    }

    pub fn body(&self) -> &OrgNodeBody {
        &self.body
    }

    pub fn members(&self) -> &[Member] {
        self.body.members()
    }

    pub fn subdepartments(&self) -> &[OrgNode] {
        self.body.subdepartments()
    }

    /// Finds a node by id anywhere in this subtree.
    pub fn find_node(&self, node_id: &str) -> Option<&OrgNode> {
        if self.id == node_id {
            return Some(self);
        }
        self.subdepartments()
            .iter()
            .find_map(|child| child.find_node(node_id))
    }

    /// Finds a member (lead or regular) anywhere in this subtree.
    pub fn find_member(&self, member_id: &str) -> Option<&Member> {
        if let Some(lead) = self.lead.as_ref().filter(|lead| lead.id == member_id) {
            return Some(lead);
        }
        if let Some(member) = self.members().iter().find(|member| member.id == member_id) {
            return Some(member);
        }
        self.subdepartments()
            .iter()
            .find_map(|child| child.find_member(member_id))
    }

    /// Depth-first walk in declared child order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a OrgNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a OrgNode, usize)) {
        visit(self, depth);
        for child in self.subdepartments() {
            child.walk_at(depth + 1, visit);
        }
    }

    fn check_unique_ids(&self) -> Result<(), OrgTreeError> {
        let mut node_ids = HashSet::<&str>::new();
        let mut member_ids = HashSet::<&str>::new();
        let mut failure = None;
        self.walk(&mut |node, _| {
            if failure.is_some() {
                return;
            }
            if !node_ids.insert(node.id.as_str()) {
                failure = Some(OrgTreeError::DuplicateNodeId(node.id.clone()));
                return;
            }
            for member in node.lead.iter().chain(node.members()) {
                if !member_ids.insert(member.id.as_str()) {
                    failure = Some(OrgTreeError::DuplicateMemberId(member.id.clone()));
                    return;
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Serialized nested shape used by seed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgNodeSpec {
    pub id: OrgNodeId,
    pub name: String,
    #[serde(default)]
    pub lead: Option<Member>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub subdepartments: Vec<OrgNodeSpec>,
}

impl OrgNodeSpec {
    pub fn build(self) -> Result<OrgNode, OrgTreeError> {
        let subdepartments = self
            .subdepartments
            .into_iter()
            .map(OrgNodeSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        OrgNode::new(self.id, self.name, self.lead, self.members, subdepartments)
    }
}

impl From<&OrgNode> for OrgNodeSpec {
    fn from(node: &OrgNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            lead: node.lead.clone(),
            members: node.members().to_vec(),
            subdepartments: node.subdepartments().iter().map(OrgNodeSpec::from).collect(),
        }
    }
}

/// Errors from org tree construction and lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgTreeError {
    BlankNodeId,
    BlankNodeName(OrgNodeId),
    /// Node has neither members nor subdepartments.
    EmptyNode(OrgNodeId),
    DuplicateNodeId(OrgNodeId),
    DuplicateMemberId(MemberId),
    NodeNotFound(OrgNodeId),
    MemberNotFound(MemberId),
}

impl Display for OrgTreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankNodeId => write!(f, "org node id must not be blank"),
            Self::BlankNodeName(id) => write!(f, "org node name must not be blank: {id}"),
            Self::EmptyNode(id) => {
                write!(f, "org node has neither members nor subdepartments: {id}")
            }
            Self::DuplicateNodeId(id) => write!(f, "org node id appears twice: {id}"),
            Self::DuplicateMemberId(id) => write!(f, "member appears twice in org tree: {id}"),
            Self::NodeNotFound(id) => write!(f, "org node not found: {id}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
        }
    }
}

impl Error for OrgTreeError {}
