//! Attempt history: the append-only record of completed quiz rounds.

use crate::question::{Question, QuizResult};

/// Completed quiz attempts, kept so the user can review earlier rounds while
/// practicing again. Entries are only appended; the whole structure is
/// cleared exclusively by a full flow reset, never by a mode switch.
///
/// The two lists are parallel: attempt `i` pairs `previous_questions[i]`
/// with `previous_results[i]`, and their lengths are always equal.
#[derive(Debug, Default)]
pub struct AttemptHistory {
    previous_questions: Vec<Vec<Question>>,
    previous_results: Vec<QuizResult>,
}

impl AttemptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one completed attempt.
    pub fn record(&mut self, questions: Vec<Question>, result: QuizResult) {
        self.previous_questions.push(questions);
        self.previous_results.push(result);
        debug_assert_eq!(self.previous_questions.len(), self.previous_results.len());
    }

    /// Number of completed attempts.
    pub fn len(&self) -> usize {
        self.previous_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous_results.is_empty()
    }

    /// The attempt at `index`, oldest first.
    pub fn attempt(&self, index: usize) -> Option<(&[Question], &QuizResult)> {
        Some((
            self.previous_questions.get(index)?.as_slice(),
            self.previous_results.get(index)?,
        ))
    }

    /// Iterates over all attempts, oldest first.
    pub fn attempts(&self) -> impl Iterator<Item = (&[Question], &QuizResult)> {
        self.previous_questions
            .iter()
            .map(Vec::as_slice)
            .zip(self.previous_results.iter())
    }

    pub fn clear(&mut self) {
        self.previous_questions.clear();
        self.previous_results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::ResultDetails;

    fn result(correct: u32, wrong: u32) -> QuizResult {
        QuizResult {
            total_correct_answers: correct,
            total_wrong_answers: wrong,
            details: ResultDetails { questions: vec![] },
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                question: format!("questão {i}"),
                options: vec!["(a) sim".into(), "(b) não".into()],
            })
            .collect()
    }

    #[test]
    fn lists_stay_parallel_across_appends() {
        let mut history = AttemptHistory::new();
        assert_eq!(history.len(), 0);

        for round in 1..=3 {
            history.record(questions(5), result(round, 5 - round));
            assert_eq!(history.len(), round as usize);
        }

        let (qs, res) = history.attempt(1).expect("second attempt");
        assert_eq!(qs.len(), 5);
        assert_eq!(res.total_correct_answers, 2);
    }

    #[test]
    fn attempts_iterate_oldest_first() {
        let mut history = AttemptHistory::new();
        history.record(questions(2), result(0, 2));
        history.record(questions(3), result(3, 0));

        let totals: Vec<u32> = history.attempts().map(|(_, r)| r.total()).collect();
        assert_eq!(totals, vec![2, 3]);
    }

    #[test]
    fn clear_empties_both_lists() {
        let mut history = AttemptHistory::new();
        history.record(questions(1), result(1, 0));
        history.clear();
        assert!(history.is_empty());
        assert!(history.attempt(0).is_none());
    }
}
