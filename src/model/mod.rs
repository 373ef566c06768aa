pub mod grade;
pub mod sample;

pub use grade::{ErrorResponse, GradeRequest, GradeResponse, GENERIC_GRADING_ERROR};
pub use sample::{LetterGrade, Sample};
