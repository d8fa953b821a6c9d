use thiserror::Error;

/// Failure talking to the foot-trail directions service.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("directions service unreachable: {0}")]
    Unavailable(String),
    #[error("directions service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("no directions API key or proxy configured")]
    NoCredentials,
    #[error("directions service returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Failure producing a walk suggestion from the language model.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("no language model API key configured")]
    NoCredentials,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("language model unreachable: {0}")]
    Unavailable(String),
    #[error("language model rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed language model response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access walk store: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid walk data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("walk not found: {0}")]
    NotFound(String),
    #[error("walk store lock poisoned")]
    Poisoned,
}

/// Why a single walk was skipped during a library re-route.
#[derive(Debug, Error)]
pub enum RerouteError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("GPX output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
