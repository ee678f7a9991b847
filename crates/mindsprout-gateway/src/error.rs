use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{}", transport_message(*status, message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Backend did not answer within {} ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("Malformed backend response: {message}")]
    MalformedResponse { message: String },
}

impl Error {
    /// Network, HTTP status and timeout failures: the request may succeed if retried.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Backend request failed (HTTP {status}): {message}"),
        None => format!("Backend request failed: {message}"),
    }
}
