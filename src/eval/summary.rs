use serde_json::{json, Value};

use crate::eval::Evaluation;
use crate::tools::ToolOutput;

/// Attach `evaluation` to an operation's output: as an `auto_evaluation` key
/// on a JSON object, otherwise as a text block appended after a blank line.
pub fn enhance_output(output: ToolOutput, evaluation: &Evaluation) -> ToolOutput {
    match output {
        ToolOutput::Json(Value::Object(mut map)) => {
            map.insert("auto_evaluation".to_string(), evaluation_json(evaluation));
            ToolOutput::Json(Value::Object(map))
        }
        ToolOutput::Json(other) => ToolOutput::Text(format!(
            "{}\n\n{}",
            other,
            summary_text(evaluation)
        )),
        ToolOutput::Text(text) => {
            ToolOutput::Text(format!("{}\n\n{}", text, summary_text(evaluation)))
        }
    }
}

fn evaluation_json(evaluation: &Evaluation) -> Value {
    let mut value = json!({
        "project_name": evaluation.project_name,
        "updates_applied": evaluation.updates_applied,
        "attention_count": evaluation.attention_items.len(),
        "processing_time": format!("{:?}", evaluation.processing_time),
        "cache_hit": evaluation.cache_hit,
        "evaluation_time": evaluation.evaluation_time.to_rfc3339(),
    });
    if !evaluation.attention_items.is_empty() {
        let items: Vec<Value> = evaluation
            .attention_items
            .iter()
            .map(|item| {
                json!({
                    "task_title": item.task_title,
                    "reason": item.reason,
                    "type": item.kind,
                })
            })
            .collect();
        value["attention_items"] = Value::Array(items);
    }
    value
}

fn summary_text(evaluation: &Evaluation) -> String {
    let mut lines = vec![
        "Auto-Evaluation Summary".to_string(),
        format!("Project: {}", evaluation.project_name),
        format!("Processing Time: {:?}", evaluation.processing_time),
        format!(
            "Source: {}",
            if evaluation.cache_hit {
                "Cache"
            } else {
                "Fresh evaluation"
            }
        ),
    ];

    if !evaluation.updates_applied.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Updates Applied ({}):",
            evaluation.updates_applied.len()
        ));
        lines.extend(evaluation.updates_applied.iter().map(|u| format!("- {}", u)));
    }
    if !evaluation.attention_items.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Tasks Needing Attention ({}):",
            evaluation.attention_items.len()
        ));
        lines.extend(
            evaluation
                .attention_items
                .iter()
                .map(|item| format!("- {}: {}", item.task_title, item.reason)),
        );
    }
    if evaluation.updates_applied.is_empty() && evaluation.attention_items.is_empty() {
        lines.push(String::new());
        lines.push("All tasks are up-to-date and no attention needed.".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{AttentionItem, AttentionType};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn evaluation(updates: &[&str], attention: bool) -> Evaluation {
        Evaluation {
            project_name: "demo".into(),
            updates_applied: updates.iter().map(|s| s.to_string()).collect(),
            attention_items: if attention {
                vec![AttentionItem {
                    task_id: 3,
                    task_title: "Refactor".into(),
                    subtask_title: None,
                    reason: "No updates for 9 days".into(),
                    kind: AttentionType::Stale,
                    severity: 3,
                }]
            } else {
                Vec::new()
            },
            evaluation_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            processing_time: Duration::from_millis(4),
            cache_hit: false,
        }
    }

    #[test]
    fn test_json_object_gains_key() {
        let out = enhance_output(
            ToolOutput::Json(json!({"ok": true})),
            &evaluation(&["Task 'A' auto-completed"], true),
        );
        let ToolOutput::Json(value) = out else {
            panic!("expected json");
        };
        assert_eq!(value["ok"], json!(true));
        let eval = &value["auto_evaluation"];
        assert_eq!(eval["attention_count"], json!(1));
        assert_eq!(eval["processing_time"], json!("4ms"));
        assert_eq!(eval["evaluation_time"], json!("2024-05-01T12:00:00+00:00"));
        assert_eq!(
            eval["attention_items"],
            json!([{"task_title": "Refactor", "reason": "No updates for 9 days", "type": "stale"}])
        );
    }

    #[test]
    fn test_json_without_attention_omits_items() {
        let out = enhance_output(ToolOutput::Json(json!({})), &evaluation(&[], false));
        let ToolOutput::Json(value) = out else {
            panic!("expected json");
        };
        assert!(value["auto_evaluation"].get("attention_items").is_none());
    }

    #[test]
    fn test_text_gets_summary_block() {
        let out = enhance_output(
            ToolOutput::Text("Saved.".into()),
            &evaluation(&["Task 'A' auto-completed"], true),
        );
        assert_eq!(
            out,
            ToolOutput::Text(
                "Saved.\n\n\
                 Auto-Evaluation Summary\n\
                 Project: demo\n\
                 Processing Time: 4ms\n\
                 Source: Fresh evaluation\n\
                 \n\
                 Updates Applied (1):\n\
                 - Task 'A' auto-completed\n\
                 \n\
                 Tasks Needing Attention (1):\n\
                 - Refactor: No updates for 9 days"
                    .into()
            )
        );
    }

    #[test]
    fn test_quiet_evaluation_and_non_object_json() {
        let mut quiet = evaluation(&[], false);
        quiet.cache_hit = true;
        let ToolOutput::Text(text) = enhance_output(ToolOutput::Json(json!([1, 2])), &quiet) else {
            panic!("expected text");
        };
        assert!(text.starts_with("[1,2]\n\nAuto-Evaluation Summary"));
        assert!(text.contains("Source: Cache"));
        assert!(text.ends_with("All tasks are up-to-date and no attention needed."));
    }
}
