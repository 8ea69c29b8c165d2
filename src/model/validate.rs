//! Field validation and canonical defaults. Everything here is pure.

use chrono::Utc;

use super::choice::Choice;
use super::task::{Category, Complexity, Priority, Status};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_ESTIMATED_HOURS: u32 = 1000;

/// Characters that cannot appear in a project name
const FORBIDDEN_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Error type for field validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid project name: {0}")]
    InvalidName(String),
    #[error("invalid title: {0}")]
    InvalidTitle(String),
    #[error("invalid description: {0}")]
    InvalidDescription(String),
    #[error("invalid {field}: {value}. Valid options: {}", allowed.join(", "))]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        allowed: Vec<&'static str>,
    },
    #[error("invalid choice: {0}")]
    InvalidChoice(String),
    #[error("estimated hours out of range (0-{max}): {0}", max = MAX_ESTIMATED_HOURS)]
    InvalidEstimatedHours(u32),
}

// ---------------------------------------------------------------------------
// Enum fields
// ---------------------------------------------------------------------------

fn invalid_enum(field: &'static str, value: &str, allowed: Vec<&'static str>) -> ValidationError {
    ValidationError::InvalidEnumValue {
        field,
        value: value.to_string(),
        allowed,
    }
}

pub fn validate_status(raw: &str) -> Result<Status, ValidationError> {
    Status::from_str_exact(raw).ok_or_else(|| {
        invalid_enum("status", raw, Status::ALL.iter().map(|s| s.as_str()).collect())
    })
}

pub fn validate_category(raw: &str) -> Result<Category, ValidationError> {
    Category::from_str_exact(raw).ok_or_else(|| {
        invalid_enum("category", raw, Category::ALL.iter().map(|c| c.as_str()).collect())
    })
}

pub fn validate_priority(raw: &str) -> Result<Priority, ValidationError> {
    Priority::from_str_exact(raw).ok_or_else(|| {
        invalid_enum("priority", raw, Priority::ALL.iter().map(|p| p.as_str()).collect())
    })
}

pub fn validate_complexity(raw: &str) -> Result<Complexity, ValidationError> {
    Complexity::from_str_exact(raw).ok_or_else(|| {
        invalid_enum(
            "complexity",
            raw,
            Complexity::ALL.iter().map(|c| c.as_str()).collect(),
        )
    })
}

// ---------------------------------------------------------------------------
// Names and text
// ---------------------------------------------------------------------------

pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName(
            "project name cannot be empty".into(),
        ));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(ValidationError::InvalidName(format!(
            "project name contains invalid character: {}",
            c
        )));
    }
    Ok(())
}

/// Make a name safe to use as a filename stem. Never fails and never returns
/// an empty string.
pub fn sanitize_project_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == ' ' || FORBIDDEN_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        format!("project_{}", Utc::now().timestamp())
    } else {
        trimmed.to_string()
    }
}

/// Titles are single-line, non-empty, and at most 200 characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::InvalidTitle("title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::InvalidTitle(format!(
            "title too long (max {} characters)",
            MAX_TITLE_LEN
        )));
    }
    if title.contains(['\n', '\r']) {
        return Err(ValidationError::InvalidTitle(
            "title cannot contain line breaks".into(),
        ));
    }
    Ok(())
}

pub fn validate_description(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::InvalidDescription(
            "description cannot be empty".into(),
        ));
    }
    if text.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::InvalidDescription(format!(
            "description too long (max {} characters)",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

pub fn validate_choice(choice: &Choice) -> Result<(), ValidationError> {
    if choice.question.trim().is_empty() {
        return Err(ValidationError::InvalidChoice(
            "choice question cannot be empty".into(),
        ));
    }
    if choice.options.len() < 2 {
        return Err(ValidationError::InvalidChoice(
            "choice must have at least 2 options".into(),
        ));
    }
    if let Some(i) = choice.options.iter().position(|o| o.trim().is_empty()) {
        return Err(ValidationError::InvalidChoice(format!(
            "choice option {} cannot be empty",
            i + 1
        )));
    }
    if let Some(selected) = choice.selected.as_deref()
        && !selected.is_empty()
        && !choice.options.iter().any(|o| o == selected)
    {
        return Err(ValidationError::InvalidChoice(format!(
            "selected option '{}' is not in the available options",
            selected
        )));
    }
    Ok(())
}

pub fn is_valid_estimated_hours(hours: u32) -> bool {
    hours <= MAX_ESTIMATED_HOURS
}

pub fn validate_estimated_hours(hours: u32) -> Result<u32, ValidationError> {
    if is_valid_estimated_hours(hours) {
        Ok(hours)
    } else {
        Err(ValidationError::InvalidEstimatedHours(hours))
    }
}

pub fn default_status() -> Status {
    Status::Todo
}

pub fn default_priority() -> Priority {
    Priority::P2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_validation_is_exact() {
        assert_eq!(validate_status("in_progress"), Ok(Status::InProgress));
        assert_eq!(validate_priority("P0"), Ok(Priority::P0));
        assert_eq!(validate_category("[UX]"), Ok(Category::Ux));
        assert_eq!(validate_complexity("medium"), Ok(Complexity::Medium));

        let err = validate_status("finished").unwrap_err();
        assert!(matches!(
            &err,
            ValidationError::InvalidEnumValue { field: "status", allowed, .. } if allowed.len() == 4
        ));
        assert_eq!(
            err.to_string(),
            "invalid status: finished. Valid options: todo, in_progress, done, blocked"
        );
        assert!(validate_priority("p1").is_err());
        assert!(validate_category("MVP").is_err());
    }

    #[test]
    fn test_project_name_validation() {
        assert!(validate_project_name("demo").is_ok());
        assert!(validate_project_name("my project").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("   ").is_err());
        for bad in ["a/b", "a\\b", "a:b", "a*b", "a?b", "a\"b", "a<b", "a>b", "a|b"] {
            assert!(
                matches!(validate_project_name(bad), Err(ValidationError::InvalidName(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("my project"), "my_project");
        assert_eq!(sanitize_project_name("a//b::c"), "a_b_c");
        assert_eq!(sanitize_project_name("__x__"), "x");
        assert_eq!(sanitize_project_name(" web app / v2 "), "web_app_v2");
        let fallback = sanitize_project_name("///");
        assert!(fallback.starts_with("project_"));
        assert!(fallback.len() > "project_".len());
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Write spec").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(200)).is_ok());
        assert!(validate_title(&"x".repeat(201)).is_err());
        assert!(validate_title("two\nlines").is_err());
    }

    #[test]
    fn test_description_validation() {
        assert!(validate_description("something").is_ok());
        assert!(validate_description("  ").is_err());
        assert!(validate_description(&"d".repeat(5000)).is_ok());
        assert!(matches!(
            validate_description(&"d".repeat(5001)),
            Err(ValidationError::InvalidDescription(_))
        ));
    }

    #[test]
    fn test_choice_validation() {
        let mut choice = Choice::new("Which DB?", vec!["Postgres".into(), "SQLite".into()]);
        assert!(validate_choice(&choice).is_ok());

        choice.selected = Some("SQLite".into());
        assert!(validate_choice(&choice).is_ok());

        choice.selected = Some("MySQL".into());
        assert!(validate_choice(&choice).is_err());

        choice.selected = None;
        choice.options = vec!["only".into()];
        assert!(validate_choice(&choice).is_err());

        choice.options = vec!["a".into(), " ".into()];
        assert!(validate_choice(&choice).is_err());

        choice.options = vec!["a".into(), "b".into()];
        choice.question = String::new();
        assert!(validate_choice(&choice).is_err());
    }

    #[test]
    fn test_estimated_hours_bounds() {
        assert!(is_valid_estimated_hours(0));
        assert!(is_valid_estimated_hours(1000));
        assert!(!is_valid_estimated_hours(1001));
        assert_eq!(
            validate_estimated_hours(1001),
            Err(ValidationError::InvalidEstimatedHours(1001))
        );
    }
}
