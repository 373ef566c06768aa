pub mod ai;
pub mod ai_types;
pub mod encoding;
pub mod grading;
pub mod prompt;
pub mod verdict;
