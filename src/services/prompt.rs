use crate::model::grade::GradeRequest;
use crate::model::sample::Sample;

const INSTRUCTIONS: &str = "\
I want you to grade some essays by 8th grade students.
You should generally grade in a harsh but fair manner. I will give you some examples of writing and the grade those got first, and then you can use those as references to guide your grading.
Start by giving a few positive comments on the essay, then give specific feedback, and end by assigning the letter grade. Your feedback should include
around 3 specific passages the student did poorly, with examples of how to improve those passages. It should also comment on the overall
structure and flow of the essay. The letter grade should be a single letter, and should be one of A, B, C, D, or F (+/-).";

fn render_sample(sample: &Sample) -> String {
    format!("Example: {}\nGrade: {}", sample.text, sample.grade)
}

/// Builds the full grading instruction sent to the model.
///
/// Samples are rendered verbatim and in list order; nothing here validates
/// their text or grade.
pub fn build_prompt(request: &GradeRequest) -> String {
    let mut p = String::new();

    p.push_str(INSTRUCTIONS);
    p.push_str("\n\n");

    p.push_str(&format!("Essay prompt: {}\n\n", request.essay_prompt));

    if !request.samples.is_empty() {
        let examples: Vec<String> = request.samples.iter().map(render_sample).collect();
        p.push_str(&examples.join("\n\n"));
        p.push_str("\n\n");
    }

    p.push_str("Now grade the following essay (format with markdown):\n\n");
    p.push_str(&request.essay_text);

    p
}
