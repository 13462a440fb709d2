//! Canonical answer-letter mapping for submitted quiz options.
//!
//! Selected options arrive as free text such as `"(a) uma estrutura de
//! repetição"`. Grading expects the canonical letter A-E. An option that does
//! not resolve to a letter is submitted as the sentinel [`UNMAPPED`] so the
//! backend grades it as wrong, rather than being silently coerced to `A`.

/// Sentinel emitted for an option whose letter cannot be determined.
pub const UNMAPPED: char = '?';

/// Maps one selected option string to its canonical answer letter.
///
/// Leading whitespace and opening punctuation (`(`, `[`) are skipped; the
/// first remaining character decides the letter, case-insensitively.
pub fn canonical_letter(option: &str) -> char {
    let first = option
        .chars()
        .find(|c| !c.is_whitespace() && !matches!(c, '(' | '['));
    match first {
        Some(c) if ('a'..='e').contains(&c.to_ascii_lowercase()) => c.to_ascii_uppercase(),
        _ => UNMAPPED,
    }
}

/// Maps a full submission, one letter per question in submission order.
pub fn letters_for(answers: &[String]) -> Vec<String> {
    answers
        .iter()
        .map(|a| canonical_letter(a).to_string())
        .collect()
}
