//! Quiz domain types shared between the flow controller and the gateway.

use serde::{Deserialize, Serialize};

/// The maximum number of options a question may carry; positions map to the
/// answer letters A through E.
pub const MAX_OPTIONS: usize = 5;

/// A single multiple-choice question as produced by the dialogue backend.
///
/// `options` is ordered; position 0 corresponds to answer letter A, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
}

impl Question {
    /// Returns the answer letter for an option position, if the position is
    /// within the A-E range.
    pub fn letter_for(index: usize) -> Option<char> {
        if index < MAX_OPTIONS {
            Some((b'A' + index as u8) as char)
        } else {
            None
        }
    }
}

/// The graded outcome of one submitted quiz attempt. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub total_correct_answers: u32,
    pub total_wrong_answers: u32,
    #[serde(rename = "detalhes")]
    pub details: ResultDetails,
}

impl QuizResult {
    /// Total number of graded questions in this attempt.
    pub fn total(&self) -> u32 {
        self.total_correct_answers + self.total_wrong_answers
    }
}

/// Per-question breakdown carried inside a [`QuizResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDetails {
    pub questions: Vec<AnswerDetail>,
}

/// What the user picked versus what was correct, with an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question: String,
    pub selected_option: String,
    pub correct_option: String,
    pub explanation: String,
}
