use super::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One subtopic as returned by the topic backend.
///
/// Accepted shapes, tried in order:
/// - a bare string (`"Beach"`)
/// - an object with `name` (or `label`), optional `id` and optional nested `children`
/// - anything else, kept verbatim and later replaced by a placeholder node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubtopicEntry {
    Label(String),
    Topic {
        #[serde(rename = "name", alias = "label")]
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<SubtopicEntry>,
    },
    Malformed(Value),
}

impl SubtopicEntry {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub fn topic(label: impl Into<String>, children: Vec<SubtopicEntry>) -> Self {
        Self::Topic {
            label: label.into(),
            id: None,
            children,
        }
    }

    /// The trimmed label, or `None` when the entry carries no usable text.
    pub fn label_text(&self) -> Option<&str> {
        let raw = match self {
            Self::Label(label) => label,
            Self::Topic { label, .. } => label,
            Self::Malformed(_) => return None,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn requested_id(&self) -> Option<&str> {
        match self {
            Self::Topic { id: Some(id), .. } if !id.trim().is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[SubtopicEntry] {
        match self {
            Self::Topic { children, .. } => children,
            _ => &[],
        }
    }
}

impl From<&str> for SubtopicEntry {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

/// A recoverable problem found while attaching entries.
///
/// `path` points at the offending entry, e.g. `subtopics[2].children[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

/// Result of a batch insertion: new ids in pre-order plus anything that had to be patched up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insertion {
    pub added: Vec<NodeId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Insertion {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_every_accepted_shape() {
        let entries: Vec<SubtopicEntry> = serde_json::from_value(json!([
            "Beach",
            {"name": "Budget", "children": ["Flights", {"label": "Hotels"}]},
            {"name": "Visa", "id": "visa-1"},
            42,
            {"title": "no name"}
        ]))
        .unwrap();

        assert_eq!(entries[0], SubtopicEntry::label("Beach"));
        assert_eq!(entries[1].label_text(), Some("Budget"));
        assert_eq!(entries[1].children().len(), 2);
        assert_eq!(entries[1].children()[1].label_text(), Some("Hotels"));
        assert_eq!(entries[2].requested_id(), Some("visa-1"));
        assert!(matches!(entries[3], SubtopicEntry::Malformed(_)));
        assert!(matches!(entries[4], SubtopicEntry::Malformed(_)));
    }

    #[test]
    fn blank_labels_have_no_text() {
        assert_eq!(SubtopicEntry::label("   ").label_text(), None);
        assert_eq!(SubtopicEntry::label("  Trim me ").label_text(), Some("Trim me"));
    }
}
