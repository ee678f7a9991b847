use crate::{Error, GeneratedTree, Result, SubtopicEntry, TopicGateway, validate_seed};
use mindsprout_core::MindmapConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    central_idea: &'a str,
}

#[derive(Serialize)]
struct SubtopicsRequest<'a> {
    topic: &'a str,
}

// `Bare` goes first: a struct variant would also accept a sequence.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubtopicsResponse {
    Bare(Vec<SubtopicEntry>),
    Wrapped {
        #[serde(default, deserialize_with = "crate::lenient_subtopics")]
        subtopics: Vec<SubtopicEntry>,
    },
}

impl SubtopicsResponse {
    fn into_entries(self) -> Vec<SubtopicEntry> {
        match self {
            Self::Wrapped { subtopics } | Self::Bare(subtopics) => subtopics,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// JSON-over-HTTP client for the topic backend.
///
/// Endpoints are resolved relative to the base URL, so a base of `http://host/api` posts to
/// `http://host/api/generate`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Transport {
                status: None,
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Reads `gateway.baseUrl` and `gateway.timeoutMs`.
    pub fn from_config(config: &MindmapConfig) -> Result<Self> {
        let base_url = config
            .get_str("gateway.baseUrl")
            .unwrap_or(DEFAULT_BASE_URL);
        let timeout = config
            .get_u64("gateway.timeoutMs")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self::with_timeout(base_url, timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(endpoint)?;
        tracing::info!(%url, "posting to topic backend");

        let resp = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            tracing::error!(%url, status = status.as_u16(), %message, "topic backend returned an error");
            return Err(Error::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            tracing::error!(%url, error = %err, "undecodable topic backend response");
            Error::MalformedResponse {
                message: format!("{endpoint}: {err}"),
            }
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            tracing::error!(timeout_ms = self.timeout.as_millis() as u64, "topic backend timed out");
            return Error::Timeout {
                timeout: self.timeout,
            };
        }
        tracing::error!(error = %err, "topic backend unreachable");
        Error::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl TopicGateway for HttpGateway {
    async fn generate(&self, seed: &str) -> Result<GeneratedTree> {
        let seed = validate_seed(seed, "central idea")?;
        self.post_json("generate", &GenerateRequest { central_idea: seed })
            .await
    }

    async fn generate_subtopics(&self, topic: &str) -> Result<Vec<SubtopicEntry>> {
        let topic = validate_seed(topic, "topic")?;
        let response: SubtopicsResponse = self
            .post_json("generate-subtopics", &SubtopicsRequest { topic })
            .await?;
        Ok(response.into_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let gateway = HttpGateway::new("http://localhost:5000/api").unwrap();
        assert_eq!(gateway.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            gateway.base_url().join("generate").unwrap().as_str(),
            "http://localhost:5000/api/generate"
        );
    }

    #[test]
    fn config_supplies_url_and_timeout() {
        let mut config = MindmapConfig::default();
        config.set_value("gateway.timeoutMs", serde_json::json!(1500));
        let gateway = HttpGateway::from_config(&config).unwrap();
        assert_eq!(gateway.base_url().as_str(), "http://127.0.0.1:5000/");
        assert_eq!(gateway.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            HttpGateway::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn subtopics_response_accepts_both_shapes() {
        let wrapped: SubtopicsResponse =
            serde_json::from_str(r#"{"subtopics":["a",{"name":"b"}]}"#).unwrap();
        assert_eq!(wrapped.into_entries().len(), 2);
        let bare: SubtopicsResponse = serde_json::from_str(r#"["a"]"#).unwrap();
        assert_eq!(bare.into_entries(), vec![SubtopicEntry::label("a")]);
    }

    #[test]
    fn unusable_subtopics_field_means_no_results() {
        for body in [
            r#"{"subtopics":null}"#,
            r#"{}"#,
            r#"{"subtopics":"oops"}"#,
            r#"{"subtopics":{"a":1}}"#,
        ] {
            let response: SubtopicsResponse = serde_json::from_str(body).unwrap();
            assert!(response.into_entries().is_empty(), "{body}");
        }
    }
}
