#![forbid(unsafe_code)]

//! Topic tree model for AI-assisted mind maps (headless).
//!
//! Design goals:
//! - one explicit model instance per diagram, no ambient globals
//! - renderer-agnostic: surfaces consume [`TopicTree`] snapshots, never the other way around
//! - deterministic, testable ids when requested ([`IdSource::sequential`])

pub mod config;
pub mod error;
pub mod tree;

pub use config::MindmapConfig;
pub use error::{Error, Result};
pub use tree::{
    Diagnostic, ExpansionRequest, ExpansionState, IdSource, Insertion, NodeId, NodeOrigin,
    SubtopicEntry, TopicNode, TopicRenderEdge, TopicRenderNode, TopicTree, TopicTreeRenderModel,
};
