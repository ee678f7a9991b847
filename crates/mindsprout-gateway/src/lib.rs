#![forbid(unsafe_code)]

//! Clients for the topic backend.
//!
//! The backend exposes two request/response calls: build an initial topic tree from a seed
//! phrase, and list subtopics for one topic label. [`TopicGateway`] abstracts over them so the
//! session never depends on a transport.

mod error;
mod http;
mod offline;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::future::Future;

pub use error::{Error, Result};
pub use http::HttpGateway;
pub use mindsprout_core::SubtopicEntry;
pub use offline::OfflineGateway;

/// Initial tree as returned by `/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTree {
    pub central: String,
    #[serde(default, deserialize_with = "lenient_subtopics")]
    pub subtopics: Vec<SubtopicEntry>,
}

pub trait TopicGateway {
    /// Builds an initial tree for `seed`. A blank seed fails with [`Error::InvalidInput`]
    /// before any request is made.
    fn generate(&self, seed: &str) -> impl Future<Output = Result<GeneratedTree>> + Send;

    /// Lists subtopics for `topic`. An empty list is a valid answer.
    fn generate_subtopics(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Vec<SubtopicEntry>>> + Send;
}

/// Either gateway, chosen at runtime (e.g. by a `--offline` flag).
#[derive(Debug, Clone)]
pub enum AnyGateway {
    Http(HttpGateway),
    Offline(OfflineGateway),
}

impl TopicGateway for AnyGateway {
    async fn generate(&self, seed: &str) -> Result<GeneratedTree> {
        match self {
            Self::Http(gateway) => gateway.generate(seed).await,
            Self::Offline(gateway) => gateway.generate(seed).await,
        }
    }

    async fn generate_subtopics(&self, topic: &str) -> Result<Vec<SubtopicEntry>> {
        match self {
            Self::Http(gateway) => gateway.generate_subtopics(topic).await,
            Self::Offline(gateway) => gateway.generate_subtopics(topic).await,
        }
    }
}

impl From<HttpGateway> for AnyGateway {
    fn from(value: HttpGateway) -> Self {
        Self::Http(value)
    }
}

impl From<OfflineGateway> for AnyGateway {
    fn from(value: OfflineGateway) -> Self {
        Self::Offline(value)
    }
}

pub(crate) fn validate_seed<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            message: format!("{what} must not be empty"),
        });
    }
    Ok(trimmed)
}

/// Decodes a `subtopics` field. `null` or anything that is not an array yields an empty list,
/// so a sloppy backend answer still produces a (central-only) tree.
pub(crate) fn lenient_subtopics<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<SubtopicEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        Value::Null => {
            tracing::debug!("subtopics is null; treating it as an empty list");
            Ok(Vec::new())
        }
        other => {
            tracing::warn!(value = %other, "subtopics is not an array; ignoring it");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_or_non_array_subtopics_become_an_empty_list() {
        for body in [
            r#"{"central":"X","subtopics":null}"#,
            r#"{"central":"X","subtopics":{"a":1}}"#,
            r#"{"central":"X","subtopics":"oops"}"#,
            r#"{"central":"X"}"#,
        ] {
            let tree: GeneratedTree = serde_json::from_str(body).unwrap();
            assert_eq!(tree.central, "X", "{body}");
            assert!(tree.subtopics.is_empty(), "{body}");
        }
    }

    #[test]
    fn array_subtopics_keep_malformed_entries_for_later() {
        let tree: GeneratedTree =
            serde_json::from_str(r#"{"central":"X","subtopics":["A",7,{"name":"B"}]}"#).unwrap();
        assert_eq!(tree.subtopics.len(), 3);
        assert!(matches!(tree.subtopics[1], SubtopicEntry::Malformed(_)));
    }
}
