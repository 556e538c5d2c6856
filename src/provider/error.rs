/// Coarse classification used by sensors to decide how a failed tick degrades.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Configuration,
    MalformedPayload,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("disconnected: {0}")]
    Disconnected(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disconnected(_) | Self::Transport(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Malformed(_) => ErrorKind::MalformedPayload,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::Malformed(error.to_string())
    }
}
