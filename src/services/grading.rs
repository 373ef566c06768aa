use tracing::info;

use crate::error::{GradeError, GradeResult};
use crate::model::grade::GradeRequest;
use crate::services::ai::CompletionModel;
use crate::services::prompt;

/// Builds the prompt for `request`, asks the model and returns its feedback.
pub async fn grade_essay(model: &dyn CompletionModel, request: &GradeRequest) -> GradeResult<String> {
    let prompt = prompt::build_prompt(request);

    info!(
        samples = request.samples.len(),
        essay_chars = request.essay_text.chars().count(),
        "grading essay"
    );

    let grade = model.complete(&prompt).await?;

    if grade.trim().is_empty() {
        return Err(GradeError::EmptyGrade);
    }

    Ok(grade)
}
