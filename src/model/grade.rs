use serde::{Deserialize, Serialize};

use crate::error::{GradeError, GradeResult};
use crate::model::sample::Sample;

/// Message returned to the client for every failure past validation.
pub const GENERIC_GRADING_ERROR: &str = "An error occurred while grading the essay.";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    pub samples: Vec<Sample>,

    pub essay_text: String,

    pub essay_prompt: String,
}

impl GradeRequest {
    /// Decodes a request body and rejects anything that would produce a degenerate prompt.
    pub fn from_json(body: &[u8]) -> GradeResult<Self> {
        let request: GradeRequest = serde_json::from_slice(body)
            .map_err(|e| GradeError::invalid_request(format!("malformed request body: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> GradeResult<()> {
        if self.essay_text.trim().is_empty() {
            return Err(GradeError::invalid_request("essayText must not be empty"));
        }
        if self.essay_prompt.trim().is_empty() {
            return Err(GradeError::invalid_request("essayPrompt must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GradeResponse {
    pub grade: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn generic() -> Self {
        Self::new(GENERIC_GRADING_ERROR)
    }
}
