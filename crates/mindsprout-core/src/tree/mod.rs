//! The topic tree: one explicit, mutable model instance per mind map.
//!
//! All structural mutations go through [`TopicTree`]; rendering surfaces only ever read from
//! it. Nodes are stored in an [`IndexMap`] keyed by id, with parent/child links kept as ids, so
//! removing a subtree is a matter of collecting the closure and dropping those entries.

mod entry;
mod id;
mod render_model;


use crate::{Error, MindmapConfig, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use entry::{Diagnostic, Insertion, SubtopicEntry};
pub use id::{IdSource, NodeId};
pub use render_model::{TopicRenderEdge, TopicRenderNode, TopicTreeRenderModel};

const DEFAULT_PLACEHOLDER_LABEL: &str = "Unnamed Topic";

/// How a node came into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeOrigin {
    Central,
    Generated,
    Expanded,
    Manual,
}

/// What a click on a node may do, derived from the model alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Retryable,
    InFlight,
    Expanded,
}

/// Issued by [`TopicTree::begin_expansion`]; carries everything a gateway call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub node_id: NodeId,
    pub label: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNode {
    id: NodeId,
    label: String,
    depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    is_loading: bool,
    is_expanded: bool,
    origin: NodeOrigin,
    section: Option<usize>,
}

impl TopicNode {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    /// Index of the root child this node descends from; `None` for the root.
    pub fn section(&self) -> Option<usize> {
        self.section
    }

    pub fn expansion_state(&self) -> ExpansionState {
        if self.is_loading {
            ExpansionState::InFlight
        } else if self.is_expanded {
            ExpansionState::Expanded
        } else {
            ExpansionState::Retryable
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopicTree {
    nodes: IndexMap<NodeId, TopicNode>,
    root: Option<NodeId>,
    ids: IdSource,
    generation: u64,
    next_section: usize,
    placeholder_label: String,
}

impl Default for TopicTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicTree {
    pub fn new() -> Self {
        Self::with_id_source(IdSource::default())
    }

    pub fn with_id_source(ids: IdSource) -> Self {
        Self {
            nodes: IndexMap::new(),
            root: None,
            ids,
            generation: 0,
            next_section: 0,
            placeholder_label: DEFAULT_PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn with_placeholder_label(mut self, label: impl Into<String>) -> Self {
        self.placeholder_label = label.into();
        self
    }

    pub fn from_config(config: &MindmapConfig) -> Self {
        let placeholder = config
            .get_str("tree.placeholderLabel")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PLACEHOLDER_LABEL);
        Self::new().with_placeholder_label(placeholder)
    }

    /// Replaces the whole tree with `root_label` and the (recursively expanded) `subtopics`.
    ///
    /// A blank root label is rejected and the previous tree is kept. Malformed entries are
    /// replaced by placeholder nodes and reported in [`Insertion::diagnostics`].
    pub fn create_from_response(
        &mut self,
        root_label: &str,
        subtopics: &[SubtopicEntry],
    ) -> Result<Insertion> {
        let root_label = root_label.trim();
        if root_label.is_empty() {
            return Err(Error::MalformedResponse {
                message: "central topic label is empty".to_string(),
            });
        }

        self.nodes.clear();
        self.generation += 1;
        self.next_section = 0;

        let root_id = self.fresh_id();
        self.nodes.insert(
            root_id.clone(),
            TopicNode {
                id: root_id.clone(),
                label: root_label.to_string(),
                depth: 0,
                parent: None,
                children: Vec::new(),
                is_loading: false,
                is_expanded: false,
                origin: NodeOrigin::Central,
                section: None,
            },
        );
        self.root = Some(root_id.clone());

        let mut out = Insertion {
            added: vec![root_id.clone()],
            diagnostics: Vec::new(),
        };
        self.attach_entries(
            &root_id,
            subtopics,
            NodeOrigin::Generated,
            "subtopics",
            &mut out,
        );
        if let Some(root) = self.nodes.get_mut(&root_id) {
            root.is_expanded = !root.children.is_empty();
        }

        tracing::debug!(
            generation = self.generation,
            nodes = self.nodes.len(),
            diagnostics = out.diagnostics.len(),
            "topic tree created"
        );
        Ok(out)
    }

    pub fn begin_expansion(&mut self, id: &NodeId) -> Result<ExpansionRequest> {
        let generation = self.generation;
        let node = self.nodes.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        if node.is_loading {
            return Err(Error::AlreadyInFlight { id: id.clone() });
        }
        node.is_loading = true;
        tracing::debug!(node = %id, "expansion started");
        Ok(ExpansionRequest {
            node_id: id.clone(),
            label: node.label.clone(),
            generation,
        })
    }

    /// Attaches `entries` under `id` and clears its loading flag.
    ///
    /// An `id` that is no longer in the tree (deleted, or the tree was replaced) is ignored.
    pub fn complete_expansion(
        &mut self,
        id: &NodeId,
        entries: &[SubtopicEntry],
    ) -> Result<Insertion> {
        let Some(node) = self.nodes.get_mut(id) else {
            tracing::warn!(node = %id, "discarding subtopics for a topic that no longer exists");
            return Ok(Insertion::default());
        };
        node.is_loading = false;

        let mut out = Insertion::default();
        self.attach_entries(id, entries, NodeOrigin::Expanded, "subtopics", &mut out);
        if !out.added.is_empty() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.is_expanded = true;
            }
        }
        tracing::debug!(node = %id, added = out.added.len(), "expansion completed");
        Ok(out)
    }

    /// Like [`Self::complete_expansion`], but rejects a `request` issued for a tree that has
    /// since been replaced or cleared with [`Error::StaleExpansion`], even when its node id
    /// has been reused.
    pub fn complete_request(
        &mut self,
        request: &ExpansionRequest,
        entries: &[SubtopicEntry],
    ) -> Result<Insertion> {
        self.check_current(request)?;
        self.complete_expansion(&request.node_id, entries)
    }

    /// Like [`Self::fail_expansion`], with the same staleness check as
    /// [`Self::complete_request`].
    pub fn fail_request(&mut self, request: &ExpansionRequest) -> Result<()> {
        self.check_current(request)?;
        self.fail_expansion(&request.node_id);
        Ok(())
    }

    /// Whether `request` was issued for the current tree and its node still exists.
    pub fn is_current(&self, request: &ExpansionRequest) -> bool {
        request.generation == self.generation && self.nodes.contains_key(&request.node_id)
    }

    fn check_current(&self, request: &ExpansionRequest) -> Result<()> {
        if self.is_current(request) {
            return Ok(());
        }
        tracing::warn!(
            node = %request.node_id,
            issued = request.generation,
            current = self.generation,
            "rejecting stale subtopic response"
        );
        Err(Error::StaleExpansion {
            id: request.node_id.clone(),
        })
    }

    pub fn fail_expansion(&mut self, id: &NodeId) {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.is_loading = false;
                tracing::debug!(node = %id, "expansion failed; topic is retryable");
            }
            None => tracing::debug!(node = %id, "ignoring failure for unknown topic"),
        }
    }

    pub fn rename_node(&mut self, id: &NodeId, label: &str) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidLabel);
        }
        node.label = label.to_string();
        tracing::debug!(node = %id, "topic renamed");
        Ok(())
    }

    /// Removes `id` and all of its descendants; returns exactly the removed ids (pre-order).
    pub fn delete_subtree(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        let node = self.nodes.get(id).ok_or_else(|| Error::not_found(id))?;
        let Some(parent_id) = node.parent.clone() else {
            return Err(Error::CannotDeleteRoot);
        };

        let removed = self.subtree_ids(id);
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.retain(|c| c != id);
        }
        let doomed: HashSet<&NodeId> = removed.iter().collect();
        self.nodes.retain(|k, _| !doomed.contains(k));

        tracing::debug!(node = %id, removed = removed.len(), "subtree deleted");
        Ok(removed)
    }

    pub fn add_child(&mut self, parent: &NodeId, label: &str) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::not_found(parent));
        }
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidLabel);
        }
        let id = self.fresh_id();
        self.attach(parent, id.clone(), label.to_string(), NodeOrigin::Manual)?;
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.is_expanded = true;
        }
        tracing::debug!(node = %id, parent = %parent, "topic added");
        Ok(id)
    }

    /// Drops every node. Outstanding expansion requests become stale.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.generation += 1;
        self.next_section = 0;
        tracing::debug!(generation = self.generation, "topic tree cleared");
    }

    pub fn get(&self, id: &NodeId) -> Option<&TopicNode> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&TopicNode> {
        self.root.as_ref().and_then(|id| self.nodes.get(id))
    }

    pub fn root_id(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Strict descendants of `id`, pre-order.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = self.subtree_ids(id);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// All nodes in pre-order, root first.
    pub fn nodes(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: self.root.iter().collect(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn placeholder_label(&self) -> &str {
        &self.placeholder_label
    }

    pub fn is_retryable(&self, id: &NodeId) -> bool {
        self.expansion_state(id) == Some(ExpansionState::Retryable)
    }

    pub fn expansion_state(&self, id: &NodeId) -> Option<ExpansionState> {
        self.nodes.get(id).map(TopicNode::expansion_state)
    }

    pub fn to_render_model(&self) -> TopicTreeRenderModel {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut edges = Vec::with_capacity(self.nodes.len().saturating_sub(1));

        for node in self.nodes() {
            let mut css = vec!["mindmap-node".to_string()];
            if node.is_root() {
                css.push("section-root".to_string());
                css.push("section--1".to_string());
            } else if let Some(section) = node.section {
                css.push(format!("section-{section}"));
            }

            nodes.push(TopicRenderNode {
                id: node.id.clone(),
                dom_id: format!("node_{}", node.id),
                label: node.label.clone(),
                depth: node.depth,
                parent: node.parent.clone(),
                section: node.section,
                origin: node.origin,
                is_loading: node.is_loading,
                is_expanded: node.is_expanded,
                css_classes: css.join(" "),
            });

            if let Some(parent) = &node.parent {
                let mut classes = "edge".to_string();
                if let Some(section) = node.section {
                    classes.push_str(&format!(" section-edge-{section}"));
                }
                classes.push_str(&format!(" edge-depth-{}", node.depth));
                edges.push(TopicRenderEdge {
                    id: format!("edge_{}_{}", parent, node.id),
                    start: parent.clone(),
                    end: node.id.clone(),
                    classes,
                    depth: node.depth,
                    section: node.section,
                });
            }
        }

        TopicTreeRenderModel {
            generation: self.generation,
            nodes,
            edges,
        }
    }

    fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur.clone());
            if let Some(node) = self.nodes.get(cur) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    fn fresh_id(&mut self) -> NodeId {
        loop {
            let id = self.ids.next_id();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn claim_id(&mut self, requested: Option<&str>, path: &str, out: &mut Insertion) -> NodeId {
        let Some(requested) = requested else {
            return self.fresh_id();
        };
        let requested = NodeId::new(requested.trim());
        if !self.nodes.contains_key(&requested) {
            return requested;
        }
        tracing::warn!(%path, id = %requested, "duplicate topic id; assigning a fresh one");
        out.diagnostics.push(Diagnostic {
            path: path.to_string(),
            message: format!("duplicate id `{requested}` replaced"),
        });
        self.fresh_id()
    }

    fn attach_entries(
        &mut self,
        parent: &NodeId,
        entries: &[SubtopicEntry],
        origin: NodeOrigin,
        path_prefix: &str,
        out: &mut Insertion,
    ) {
        for (index, entry) in entries.iter().enumerate() {
            let path = format!("{path_prefix}[{index}]");
            let label = match entry.label_text() {
                Some(label) => label.to_string(),
                None => {
                    let message = match entry {
                        SubtopicEntry::Malformed(value) => {
                            format!("unrecognised subtopic entry: {value}")
                        }
                        _ => "blank subtopic label".to_string(),
                    };
                    tracing::warn!(%path, %message, "substituting placeholder topic");
                    out.diagnostics.push(Diagnostic {
                        path: path.clone(),
                        message,
                    });
                    self.placeholder_label.clone()
                }
            };

            let id = self.claim_id(entry.requested_id(), &path, out);
            if let Err(err) = self.attach(parent, id.clone(), label, origin) {
                tracing::warn!(%path, error = %err, "dropping subtopic entry");
                continue;
            }
            out.added.push(id.clone());

            let children = entry.children();
            if !children.is_empty() {
                self.attach_entries(&id, children, origin, &format!("{path}.children"), out);
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.is_expanded = true;
                }
            }
        }
    }

    fn attach(
        &mut self,
        parent_id: &NodeId,
        id: NodeId,
        label: String,
        origin: NodeOrigin,
    ) -> Result<()> {
        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| Error::not_found(parent_id))?;
        let depth = parent.depth + 1;
        // Root children never share a section, even after a sibling was deleted.
        let section = if parent.parent.is_none() {
            let section = self.next_section;
            self.next_section += 1;
            Some(section)
        } else {
            parent.section
        };
        parent.children.push(id.clone());

        self.nodes.insert(
            id.clone(),
            TopicNode {
                id,
                label,
                depth,
                parent: Some(parent_id.clone()),
                children: Vec::new(),
                is_loading: false,
                is_expanded: false,
                origin,
                section,
            },
        );
        Ok(())
    }
}

/// Pre-order walk over a [`TopicTree`], see [`TopicTree::nodes`].
pub struct PreOrder<'a> {
    tree: &'a TopicTree,
    stack: Vec<&'a NodeId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a TopicNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            if let Some(node) = self.tree.nodes.get(id) {
                self.stack.extend(node.children.iter().rev());
                return Some(node);
            }
        }
    }
}
