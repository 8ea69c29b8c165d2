use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

static CHOICE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A recorded decision point on a task or subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    /// Present once the choice has been resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Choice {
    /// A pending choice with a freshly generated ID
    pub fn new(question: impl Into<String>, options: Vec<String>) -> Self {
        Choice {
            id: generate_choice_id(),
            question: question.into(),
            options,
            selected: None,
            reasoning: String::new(),
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// A choice that is already resolved to `selected`. Used for system-recorded
    /// decisions such as breakdown reasoning.
    pub fn resolved(
        question: impl Into<String>,
        selected: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        let selected = selected.into();
        let mut choice = Choice::new(question, vec![selected.clone()]);
        choice.selected = Some(selected);
        choice.reasoning = reasoning.into();
        choice.resolved_at = Some(choice.created_at);
        choice
    }

    pub fn is_pending(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Time-derived choice ID. The sequence suffix keeps IDs unique within the
/// process even when the clock does not advance between calls.
pub fn generate_choice_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = CHOICE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("choice_{}_{}", nanos, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_choice_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("choice_")));
    }

    #[test]
    fn test_resolved_choice() {
        let choice = Choice::resolved("Task breakdown reasoning", "Accepted breakdown", "too big");
        assert!(!choice.is_pending());
        assert_eq!(choice.selected.as_deref(), Some("Accepted breakdown"));
        assert_eq!(choice.options, vec!["Accepted breakdown"]);
    }
}
