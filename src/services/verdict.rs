use std::sync::OnceLock;

use regex::Regex;

use crate::model::sample::LetterGrade;

fn grade_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Grade: B+", "**Grade:** A-", "Final grade - C"
    RE.get_or_init(|| {
        Regex::new(r"(?i:grade)\W{0,4}?[:\-]\W{0,4}?(?P<grade>[A-DF][+-]?)(?:[^A-Za-z0-9+-]|$)")
            .expect("grade pattern is valid")
    })
}

/// Finds the letter grade the model assigned, taking the last one mentioned.
///
/// Returns `None` when the feedback never states a grade in a recognisable way.
pub fn extract_letter_grade(feedback: &str) -> Option<LetterGrade> {
    grade_re()
        .captures_iter(feedback)
        .filter_map(|caps| caps.name("grade"))
        .filter_map(|m| m.as_str().parse::<LetterGrade>().ok())
        .last()
}
