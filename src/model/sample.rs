use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A writing excerpt paired with the grade it received.
///
/// The grade is kept as a plain string on the wire so that whatever the user
/// typed ends up in the prompt unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub grade: String,
}

impl Sample {
    pub fn new(text: impl Into<String>, grade: LetterGrade) -> Self {
        Self {
            text: text.into(),
            grade: grade.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LetterGrade {
    F,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
}

impl LetterGrade {
    /// All grades from lowest to highest, in the order they are offered for selection.
    pub const ALL: [LetterGrade; 13] = [
        LetterGrade::F,
        LetterGrade::DMinus,
        LetterGrade::D,
        LetterGrade::DPlus,
        LetterGrade::CMinus,
        LetterGrade::C,
        LetterGrade::CPlus,
        LetterGrade::BMinus,
        LetterGrade::B,
        LetterGrade::BPlus,
        LetterGrade::AMinus,
        LetterGrade::A,
        LetterGrade::APlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::F => "F",
            LetterGrade::DMinus => "D-",
            LetterGrade::D => "D",
            LetterGrade::DPlus => "D+",
            LetterGrade::CMinus => "C-",
            LetterGrade::C => "C",
            LetterGrade::CPlus => "C+",
            LetterGrade::BMinus => "B-",
            LetterGrade::B => "B",
            LetterGrade::BPlus => "B+",
            LetterGrade::AMinus => "A-",
            LetterGrade::A => "A",
            LetterGrade::APlus => "A+",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        LetterGrade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| format!("unknown letter grade: {s}"))
    }
}
