//! Essay grading service: builds a few-shot grading prompt, asks a
//! chat-completion model for feedback and serves the result over HTTP,
//! plus the client-side session that edits samples and submits essays.

pub mod client;
pub mod error;
pub mod model;
pub mod protocol;
pub mod services;

pub use error::{ClientError, ClientResult, GradeError, GradeResult};
pub use model::{
    ErrorResponse, GradeRequest, GradeResponse, LetterGrade, Sample, GENERIC_GRADING_ERROR,
};
