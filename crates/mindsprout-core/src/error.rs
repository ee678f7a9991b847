use crate::tree::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Topic not found: {id}")]
    NotFound { id: NodeId },

    #[error("Subtopics are already being generated for topic {id}")]
    AlreadyInFlight { id: NodeId },

    #[error("Topic label must not be empty")]
    InvalidLabel,

    #[error("The central topic cannot be deleted")]
    CannotDeleteRoot,

    #[error("Subtopic response for topic {id} belongs to a replaced tree")]
    StaleExpansion { id: NodeId },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

impl Error {
    pub(crate) fn not_found(id: &NodeId) -> Self {
        Self::NotFound { id: id.clone() }
    }
}
