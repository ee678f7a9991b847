use super::{NodeId, NodeOrigin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicTreeRenderModel {
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub nodes: Vec<TopicRenderNode>,
    #[serde(default)]
    pub edges: Vec<TopicRenderEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRenderNode {
    pub id: NodeId,
    #[serde(rename = "domId")]
    pub dom_id: String,
    pub label: String,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub section: Option<usize>,
    pub origin: NodeOrigin,
    #[serde(default, rename = "isLoading")]
    pub is_loading: bool,
    #[serde(default, rename = "isExpanded")]
    pub is_expanded: bool,
    #[serde(rename = "cssClasses")]
    pub css_classes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRenderEdge {
    pub id: String,
    pub start: NodeId,
    pub end: NodeId,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub section: Option<usize>,
}
