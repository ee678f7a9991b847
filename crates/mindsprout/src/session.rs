//! The view synchronizer.
//!
//! A [`Session`] owns one [`TopicTree`], a [`TopicGateway`] and a [`ViewSurface`]. Every user
//! gesture is turned into model operations first; the surface only sees the resulting
//! changes (full render for a new tree, deltas for expansions and additions, removals for
//! deletions, decoration-only updates for selection/loading/dimming and relabels).

use crate::render::{NodeVisualState, ViewSurface};
use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use mindsprout_core::{
    ExpansionRequest, ExpansionState, Insertion, MindmapConfig, NodeId, NodeOrigin,
    SubtopicEntry, TopicTree,
};
use mindsprout_gateway::TopicGateway;

const DEFAULT_NEW_NODE_LABEL: &str = "New Subtopic";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] mindsprout_core::Error),
    #[error(transparent)]
    Gateway(#[from] mindsprout_gateway::Error),
    #[error(transparent)]
    Surface(#[from] mindsprout_render::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// One expansion whose gateway call has not been applied yet.
///
/// Tickets outlive nothing: if the tree is replaced or the node deleted before
/// [`Session::finish_expansion`] runs, the response is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionTicket {
    request: ExpansionRequest,
}

impl ExpansionTicket {
    pub fn node_id(&self) -> &NodeId {
        &self.request.node_id
    }

    pub fn label(&self) -> &str {
        &self.request.label
    }

    pub fn generation(&self) -> u64 {
        self.request.generation
    }

    /// Runs the gateway call for this ticket. Does not touch the session.
    pub async fn fetch<G: TopicGateway>(
        &self,
        gateway: &G,
    ) -> mindsprout_gateway::Result<Vec<SubtopicEntry>> {
        gateway.generate_subtopics(&self.request.label).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    Expanded(Insertion),
    /// The backend answered with an empty list; the node stays retryable.
    NoResults,
    /// The gateway call failed; the node is retryable again.
    Failed { message: String },
    /// The ticket was stale and nothing was changed.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The node was selected; it was already expanded.
    Selected,
    /// The node was selected while its subtopics are still being fetched.
    Busy,
    Expansion(ExpansionOutcome),
}

pub struct Session<G, S> {
    tree: TopicTree,
    gateway: G,
    surface: S,
    selected: Option<NodeId>,
    subtopics_visible: bool,
    new_node_label: String,
    notifications: Vec<Notification>,
}

impl<G: TopicGateway, S: ViewSurface> Session<G, S> {
    pub fn new(gateway: G, surface: S) -> Self {
        Self::with_tree(TopicTree::new(), gateway, surface)
    }

    pub fn with_tree(tree: TopicTree, gateway: G, surface: S) -> Self {
        Self {
            tree,
            gateway,
            surface,
            selected: None,
            subtopics_visible: true,
            new_node_label: DEFAULT_NEW_NODE_LABEL.to_string(),
            notifications: Vec::new(),
        }
    }

    pub fn from_config(config: &MindmapConfig, gateway: G, surface: S) -> Self {
        let mut session = Self::with_tree(TopicTree::from_config(config), gateway, surface);
        if let Some(label) = config
            .get_str("tree.newNodeLabel")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            session.new_node_label = label.to_string();
        }
        session
    }

    pub fn tree(&self) -> &TopicTree {
        &self.tree
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn subtopics_visible(&self) -> bool {
        self.subtopics_visible
    }

    pub fn into_parts(self) -> (TopicTree, G, S) {
        (self.tree, self.gateway, self.surface)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Replaces the whole map with a fresh tree for `seed`.
    ///
    /// On any failure the previous tree and surface are left as they were.
    pub async fn generate(&mut self, seed: &str) -> Result<Insertion> {
        let seed = seed.trim();
        if seed.is_empty() {
            self.notify(NotificationLevel::Warning, "Please enter a central idea.");
            return Err(mindsprout_core::Error::InvalidInput {
                message: "central idea must not be empty".to_string(),
            }
            .into());
        }

        let generated = match self.gateway.generate(seed).await {
            Ok(generated) => generated,
            Err(err) => {
                self.notify(
                    NotificationLevel::Error,
                    format!("Error generating mind map: {err}"),
                );
                return Err(err.into());
            }
        };

        let inserted = match self
            .tree
            .create_from_response(&generated.central, &generated.subtopics)
        {
            Ok(inserted) => inserted,
            Err(err) => {
                self.notify(
                    NotificationLevel::Error,
                    format!("Error generating mind map: {err}"),
                );
                return Err(err.into());
            }
        };
        for diagnostic in &inserted.diagnostics {
            tracing::warn!(path = %diagnostic.path, "{}", diagnostic.message);
        }

        self.selected = None;
        self.surface.render(&self.tree)?;
        if !self.subtopics_visible {
            self.refresh_subtopic_states()?;
        }
        self.notify(NotificationLevel::Success, "Mind map generated successfully");
        Ok(inserted)
    }

    /// Marks `id` as the selection and clears the previous one.
    pub fn select(&mut self, id: &NodeId) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(mindsprout_core::Error::NotFound { id: id.clone() }.into());
        }
        let previous = self.selected.replace(id.clone());
        if let Some(previous) = previous.filter(|p| p != id && self.tree.contains(p)) {
            self.refresh(&previous)?;
        }
        self.refresh(id)
    }

    pub fn deselect(&mut self) -> Result<()> {
        if let Some(previous) = self.selected.take() {
            if self.tree.contains(&previous) {
                self.refresh(&previous)?;
            }
        }
        Ok(())
    }

    /// Selects `id` and, when the model says it is retryable, expands it.
    pub async fn click(&mut self, id: &NodeId) -> Result<ClickOutcome> {
        self.select(id)?;
        match self.tree.expansion_state(id) {
            Some(ExpansionState::Retryable) => Ok(ClickOutcome::Expansion(self.expand(id).await?)),
            Some(ExpansionState::InFlight) => Ok(ClickOutcome::Busy),
            Some(ExpansionState::Expanded) => Ok(ClickOutcome::Selected),
            None => Err(mindsprout_core::Error::NotFound { id: id.clone() }.into()),
        }
    }

    /// Requests subtopics for `id`, whether or not it has been expanded before.
    pub async fn expand(&mut self, id: &NodeId) -> Result<ExpansionOutcome> {
        let ticket = self.start_expansion(id)?;
        let result = ticket.fetch(&self.gateway).await;
        self.finish_expansion(ticket, result)
    }

    /// Expands several nodes at once.
    ///
    /// Gateway calls run concurrently; responses are applied in the order they complete.
    /// Nodes that cannot start (unknown, already loading) are reported without a request.
    pub async fn expand_many(
        &mut self,
        ids: &[NodeId],
    ) -> Vec<(NodeId, Result<ExpansionOutcome>)> {
        let mut out = Vec::with_capacity(ids.len());
        let mut tickets = Vec::new();
        for id in ids {
            match self.start_expansion(id) {
                Ok(ticket) => tickets.push(ticket),
                Err(err) => out.push((id.clone(), Err(err))),
            }
        }

        let gateway = &self.gateway;
        let mut pending: FuturesUnordered<_> = tickets
            .into_iter()
            .map(|ticket| async move {
                let result = ticket.fetch(gateway).await;
                (ticket, result)
            })
            .collect();
        let mut completed = Vec::new();
        while let Some(done) = pending.next().await {
            completed.push(done);
        }
        drop(pending);

        for (ticket, result) in completed {
            let id = ticket.node_id().clone();
            out.push((id, self.finish_expansion(ticket, result)));
        }
        out
    }

    /// Marks `id` as loading and hands out the ticket for its gateway call.
    pub fn start_expansion(&mut self, id: &NodeId) -> Result<ExpansionTicket> {
        let request = self.tree.begin_expansion(id)?;
        if let Err(err) = self.refresh(id) {
            self.tree.fail_expansion(id);
            return Err(err);
        }
        Ok(ExpansionTicket { request })
    }

    /// Applies a gateway response obtained with [`ExpansionTicket::fetch`].
    pub fn finish_expansion(
        &mut self,
        ticket: ExpansionTicket,
        result: mindsprout_gateway::Result<Vec<SubtopicEntry>>,
    ) -> Result<ExpansionOutcome> {
        let request = &ticket.request;
        let id = &request.node_id;
        if !self.tree.is_current(request) {
            tracing::warn!(node = %id, "discarding stale subtopic response");
            return Ok(ExpansionOutcome::Discarded);
        }

        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                self.tree.fail_request(request)?;
                self.refresh(id)?;
                tracing::error!(node = %id, error = %err, "subtopic generation failed");
                self.notify(
                    NotificationLevel::Error,
                    format!("Error generating subtopics: {err}"),
                );
                return Ok(ExpansionOutcome::Failed {
                    message: err.to_string(),
                });
            }
        };

        let inserted = self.tree.complete_request(request, &entries)?;
        self.refresh(id)?;
        if inserted.is_empty() {
            self.notify(NotificationLevel::Warning, "No subtopics were generated.");
            return Ok(ExpansionOutcome::NoResults);
        }
        for diagnostic in &inserted.diagnostics {
            tracing::warn!(node = %id, path = %diagnostic.path, "{}", diagnostic.message);
        }

        self.surface.apply_delta(&inserted.added, &self.tree)?;
        if !self.subtopics_visible {
            for added in &inserted.added {
                self.refresh(added)?;
            }
        }
        self.notify(
            NotificationLevel::Success,
            format!("Added {} subtopics", inserted.added.len()),
        );
        Ok(ExpansionOutcome::Expanded(inserted))
    }

    /// Current label of `id`, used to seed an edit box.
    pub fn begin_edit(&self, id: &NodeId) -> Result<String> {
        self.tree
            .get(id)
            .map(|node| node.label().to_string())
            .ok_or_else(|| mindsprout_core::Error::NotFound { id: id.clone() }.into())
    }

    pub fn confirm_edit(&mut self, id: &NodeId, label: &str) -> Result<()> {
        if let Err(err) = self.tree.rename_node(id, label) {
            if err == mindsprout_core::Error::InvalidLabel {
                self.notify(NotificationLevel::Warning, "Topic text cannot be empty.");
            }
            return Err(err.into());
        }
        let label = self.begin_edit(id)?;
        self.surface.set_label(id, &label)?;
        Ok(())
    }

    /// Adds a child under the selection (or the root) and selects it.
    pub fn add_subtopic(&mut self, label: Option<&str>) -> Result<NodeId> {
        let parent = match self.selected.clone().filter(|id| self.tree.contains(id)) {
            Some(id) => id,
            None => match self.tree.root_id() {
                Some(root) => root.clone(),
                None => {
                    self.notify(NotificationLevel::Warning, "Generate a mind map first.");
                    return Err(mindsprout_core::Error::InvalidInput {
                        message: "there is no mind map to add to".to_string(),
                    }
                    .into());
                }
            },
        };

        let label = label.unwrap_or(self.new_node_label.as_str()).to_string();
        let id = self.tree.add_child(&parent, &label)?;
        self.surface.apply_delta(std::slice::from_ref(&id), &self.tree)?;
        self.select(&id)?;
        self.notify(
            NotificationLevel::Success,
            "New topic added. Edit the text now.",
        );
        Ok(id)
    }

    /// Deletes `id` and its descendants; returns every removed id.
    pub fn delete(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        let removed = match self.tree.delete_subtree(id) {
            Ok(removed) => removed,
            Err(err) => {
                if err == mindsprout_core::Error::CannotDeleteRoot {
                    self.notify(NotificationLevel::Warning, "Cannot delete the central topic.");
                }
                return Err(err.into());
            }
        };
        if self.selected.as_ref().is_some_and(|s| removed.contains(s)) {
            self.selected = None;
        }
        self.surface.remove(&removed)?;
        self.notify(NotificationLevel::Success, "Topic deleted successfully");
        Ok(removed)
    }

    pub fn delete_selected(&mut self) -> Result<Vec<NodeId>> {
        let Some(id) = self.selected.clone() else {
            self.notify(NotificationLevel::Warning, "Select a topic to delete.");
            return Err(mindsprout_core::Error::InvalidInput {
                message: "no topic is selected".to_string(),
            }
            .into());
        };
        self.delete(&id)
    }

    /// Dims or restores expansion-generated and manually added topics. Returns the new
    /// visibility.
    pub fn toggle_subtopics(&mut self) -> Result<bool> {
        self.subtopics_visible = !self.subtopics_visible;
        self.refresh_subtopic_states()?;
        Ok(self.subtopics_visible)
    }

    /// Drops the tree and clears the surface. Outstanding tickets become stale.
    pub fn reset(&mut self) -> Result<()> {
        self.tree.clear();
        self.selected = None;
        self.surface.render(&self.tree)?;
        Ok(())
    }

    fn visual_state(&self, id: &NodeId) -> NodeVisualState {
        let Some(node) = self.tree.get(id) else {
            return NodeVisualState::default();
        };
        NodeVisualState {
            loading: node.is_loading(),
            selected: self.selected.as_ref() == Some(id),
            dimmed: !self.subtopics_visible && is_subtopic(node.origin()),
        }
    }

    fn refresh(&mut self, id: &NodeId) -> Result<()> {
        let state = self.visual_state(id);
        self.surface.set_node_visual_state(id, state)?;
        Ok(())
    }

    fn refresh_subtopic_states(&mut self) -> Result<()> {
        let ids: Vec<NodeId> = self
            .tree
            .nodes()
            .filter(|node| is_subtopic(node.origin()))
            .map(|node| node.id().clone())
            .collect();
        for id in &ids {
            self.refresh(id)?;
        }
        Ok(())
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(?level, "{message}")
            }
            NotificationLevel::Warning => tracing::warn!("{message}"),
            NotificationLevel::Error => tracing::error!("{message}"),
        }
        self.notifications.push(Notification { level, message });
    }
}

fn is_subtopic(origin: NodeOrigin) -> bool {
    matches!(origin, NodeOrigin::Expanded | NodeOrigin::Manual)
}

impl<G, S> std::fmt::Debug for Session<G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nodes", &self.tree.len())
            .field("generation", &self.tree.generation())
            .field("selected", &self.selected)
            .field("subtopics_visible", &self.subtopics_visible)
            .finish_non_exhaustive()
    }
}
