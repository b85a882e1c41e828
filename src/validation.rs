use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Present and non-blank (after trimming). Records an error otherwise.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, BLANK);
            None
        }
        Some(v) => Some(v.to_string()),
    }
}

/// Records an error when `value` is longer than `max` characters.
pub fn max_chars(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
        return false;
    }
    true
}

pub fn valid_email(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    let email = normalize_email(&required_text(errors, field, value)?);
    if !is_valid_email(&email) {
        errors.add(field, "Enter a valid email address.");
        return None;
    }
    Some(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn valid_email_normalizes() {
        let mut errors = FieldErrors::new();
        let email = valid_email(&mut errors, "email", Some("  John@Example.COM "));
        assert_eq!(email.as_deref(), Some("john@example.com"));
        assert!(errors.is_empty());
    }

    #[test]
    fn required_text_distinguishes_missing_and_blank() {
        let mut errors = FieldErrors::new();
        assert!(required_text(&mut errors, "a", None).is_none());
        assert!(required_text(&mut errors, "b", Some("   ")).is_none());
        assert_eq!(errors.get("a").unwrap(), [REQUIRED.to_string()]);
        assert_eq!(errors.get("b").unwrap(), [BLANK.to_string()]);
    }

    #[test]
    fn max_chars_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        assert!(max_chars(&mut errors, "t", "ééé", 3));
        assert!(!max_chars(&mut errors, "t", "éééé", 3));
        assert_eq!(errors.get("t").unwrap().len(), 1);
    }
}
