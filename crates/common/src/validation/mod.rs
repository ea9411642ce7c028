//! Domain validation for comment submissions
//!
//! All checks run before any write is applied; a failed check means no row
//! is touched. Marks are constrained to the five-point scale, text to a
//! configured length and to the Latin/Cyrillic/punctuation character set.

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use std::sync::OnceLock;

/// Allowed characters: English and Russian letters, digits, whitespace and
/// common punctuation. Everything else is a forbidden symbol.
const ALLOWED_TEXT_PATTERN: &str =
    r#"^[0-9A-Za-zА-Яа-яЁё\s.,!?"'\[\]{}`~<>^@#№$%;:&*()+=\\/|-]*$"#;

fn allowed_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ALLOWED_TEXT_PATTERN).expect("valid pattern"))
}

/// Check a single mark against the five-point scale {-2, -1, 0, 1, 2}
pub fn is_valid_mark(mark: i32) -> bool {
    (-2..=2).contains(&mark)
}

/// Validate all three marks of a submission
pub fn validate_marks(kindness: i32, freebie: i32, clarity: i32) -> Result<()> {
    if [kindness, freebie, clarity].into_iter().all(is_valid_mark) {
        Ok(())
    } else {
        Err(AppError::WrongMark)
    }
}

/// Validate comment text length and character set
pub fn validate_text(text: &str, max_symbols: usize) -> Result<()> {
    if text.chars().count() > max_symbols {
        return Err(AppError::CommentTooLong { max_symbols });
    }
    if !allowed_text_regex().is_match(text) {
        return Err(AppError::ForbiddenSymbol);
    }
    Ok(())
}

/// Validate an optional subject line with the same character rules
pub fn validate_subject(subject: Option<&str>, max_symbols: usize) -> Result<()> {
    match subject {
        Some(s) => validate_text(s, max_symbols),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_scale() {
        for m in -2..=2 {
            assert!(is_valid_mark(m));
        }
        assert!(!is_valid_mark(3));
        assert!(!is_valid_mark(-3));
        assert!(!is_valid_mark(5));
    }

    #[test]
    fn test_validate_marks_rejects_any_bad_dimension() {
        assert!(validate_marks(1, 0, -2).is_ok());
        assert!(validate_marks(5, -2, 0).is_err());
        assert!(validate_marks(0, 3, 0).is_err());
        assert!(validate_marks(0, 0, -5).is_err());
    }

    #[test]
    fn test_text_length_boundary() {
        let at_limit = "a".repeat(3000);
        let over_limit = "a".repeat(3001);
        assert!(validate_text(&at_limit, 3000).is_ok());
        assert!(matches!(
            validate_text(&over_limit, 3000),
            Err(AppError::CommentTooLong { max_symbols: 3000 })
        ));
    }

    #[test]
    fn test_full_allowed_character_set() {
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ\n\
                    abcdefghijklmnopqrstuvwxyz.,!?-\n\
                    абвгдежзийклмнопрстуфхцчшщъыьэюя1234567890\n\
                    \"'[]{}`~<>^@#№$%;:&*()+=\\/";
        assert!(validate_text(text, 3000).is_ok());
    }

    #[test]
    fn test_forbidden_symbols_rejected() {
        assert!(matches!(
            validate_text("полезный лектор ☻", 3000),
            Err(AppError::ForbiddenSymbol)
        ));
        assert!(matches!(
            validate_text("nice € lecture", 3000),
            Err(AppError::ForbiddenSymbol)
        ));
    }

    #[test]
    fn test_subject_is_optional() {
        assert!(validate_subject(None, 3000).is_ok());
        assert!(validate_subject(Some("Матанализ"), 3000).is_ok());
        assert!(validate_subject(Some("☺"), 3000).is_err());
    }
}
