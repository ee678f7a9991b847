use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque, tree-unique identifier of a topic node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where fresh node ids come from.
///
/// `Uuid` is the default; `Sequential` yields `"{prefix}-1"`, `"{prefix}-2"`, ... and keeps
/// snapshots and tests deterministic.
#[derive(Debug, Clone, Default)]
pub enum IdSource {
    #[default]
    Uuid,
    Sequential { prefix: String, next: u64 },
}

impl IdSource {
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self::Sequential {
            prefix: prefix.into(),
            next: 1,
        }
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        match self {
            Self::Uuid => NodeId(uuid::Uuid::new_v4().to_string()),
            Self::Sequential { prefix, next } => {
                let id = NodeId(format!("{prefix}-{next}"));
                *next += 1;
                id
            }
        }
    }
}
