//! Error types for the grading endpoint and the client controller.

/// Errors raised while turning a grade request into model feedback.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// The request body is missing fields or carries blank essay data.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A single provider attempt was answered with 429. Consumed by the retry loop.
    #[error("rate limited by model provider")]
    RateLimited,

    /// Every attempt allowed by the retry policy was rate limited.
    #[error("rate limit still in effect after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// The provider answered without any completion choice.
    #[error("no completion returned by model provider")]
    NoCompletionReturned,

    /// Network failure or a non-success answer from the provider.
    #[error("model provider call failed: {message}")]
    ProviderCallFailed { message: String },

    /// The provider answered, but the feedback text is empty.
    #[error("model returned an empty grade")]
    EmptyGrade,
}

impl GradeError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the caller sent something we refuse to grade.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

impl From<reqwest::Error> for GradeError {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderCallFailed {
            message: err.to_string(),
        }
    }
}

/// Result type for grading operations.
pub type GradeResult<T> = Result<T, GradeError>;

/// Errors raised by the client-side session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The grading endpoint could not be reached.
    #[error("failed to reach grading endpoint: {message}")]
    Transport { message: String },

    /// The endpoint answered with an error response.
    #[error("grading endpoint returned an error: {message}")]
    Rejected { message: String },

    /// The endpoint answered with something that is neither a grade nor an error.
    #[error("unexpected response from grading endpoint: {message}")]
    MalformedResponse { message: String },

    /// A grading request is already in flight.
    #[error("a grading request is already in progress")]
    Busy,

    #[error("no sample at index {index} (list has {len})")]
    SampleIndex { index: usize, len: usize },

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
