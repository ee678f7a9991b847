use crate::Result;
use mindsprout_core::{NodeId, TopicTree};

/// Decoration flags; never affect geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeVisualState {
    pub loading: bool,
    pub selected: bool,
    pub dimmed: bool,
}

/// What a session needs from whatever draws the tree.
///
/// Structural calls (`render`, `apply_delta`, `remove`) re-run layout over all nodes.
/// `set_node_visual_state` never does; `set_label` only does when the new text changes the
/// size of the node's box.
pub trait ViewSurface {
    /// Full redraw: one element per node and one connector per edge.
    fn render(&mut self, tree: &TopicTree) -> Result<()>;

    /// Creates elements only for `added` (parents before children). Existing elements are kept.
    fn apply_delta(&mut self, added: &[NodeId], tree: &TopicTree) -> Result<()>;

    /// Drops exactly the elements for `removed` and every connector touching them.
    fn remove(&mut self, removed: &[NodeId]) -> Result<()>;

    fn set_node_visual_state(&mut self, id: &NodeId, state: NodeVisualState) -> Result<()>;

    /// Replaces the text of one node. Surfaces whose box size follows the text must keep
    /// boxes from overlapping, by re-running layout if needed.
    fn set_label(&mut self, id: &NodeId, label: &str) -> Result<()>;
}
