use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::model::{
    generate_choice_id, Category, Choice, Complexity, Priority, Project, Status, Subtask, Task,
};
use crate::parse::text::{parse_meta, parse_timestamp, unescape_line};

/// Error type for document decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("corrupt document at line {line}: {reason}")]
    CorruptDocument { line: usize, reason: String },
}

fn task_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^##\s+Task\s+(\S+?):\s*(?:\[(MVP|AI|UX|INFRA|GENERAL)\]\s+)?(.+?)\s*\(([^()]*)\)(?:\s*\[([^\[\]]*)\])?$",
        )
        .expect("valid task heading regex")
    })
}

/// Decode a project document. The only hard failure is an unparsable task ID;
/// any other malformed line is skipped.
pub fn decode_project(source: &str) -> Result<Project, DecodeError> {
    let mut decoder = Decoder::new(Utc::now());
    for (idx, raw) in source.lines().enumerate() {
        decoder.feed(idx + 1, raw)?;
    }
    Ok(decoder.finish())
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Whether a trimmed description line decodes back as itself. Other lines
/// are written with a leading backslash.
pub(crate) fn is_plain_text(line: &str) -> bool {
    matches!(classify(line), Line::Text(_)) && !line.starts_with('\\')
}

fn description_line(text: &str) -> String {
    text.strip_prefix('\\').unwrap_or(text).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Rule,
    Meta(&'a str),
    ProjectTitle(&'a str),
    TaskHeading(&'a str),
    OtherHeading,
    Subsection(&'a str),
    ChoiceQuestion(&'a str),
    Checkbox { checked: bool, text: &'a str },
    EstimatedHours(&'a str),
    Bullet(&'a str),
    Text(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line == "---" {
        return Line::Rule;
    }
    if line.starts_with("<!--") {
        return Line::Meta(line);
    }
    if let Some(rest) = line.strip_prefix("###") {
        return Line::Subsection(rest.trim());
    }
    if line.starts_with("## ") {
        if line.starts_with("## Task ") {
            return Line::TaskHeading(line);
        }
        return Line::OtherHeading;
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return Line::ProjectTitle(rest.trim());
    }
    if let Some(rest) = line.strip_prefix("**Choice:**") {
        return Line::ChoiceQuestion(rest.strip_prefix(' ').unwrap_or(rest));
    }
    if let Some(rest) = line.strip_prefix("Estimated hours:") {
        return Line::EstimatedHours(rest.trim());
    }
    if let Some(checkbox) = parse_checkbox(line) {
        return checkbox;
    }
    if let Some(rest) = line.strip_prefix('-') {
        return Line::Bullet(rest.trim_start());
    }
    Line::Text(line)
}

/// `- [ ] text` / `- [x] text`
fn parse_checkbox(line: &str) -> Option<Line<'_>> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let mark = chars.next()?;
    let after = chars.as_str().strip_prefix(']')?;
    let checked = match mark {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let text = if after.is_empty() {
        after
    } else {
        after.strip_prefix(' ')?
    };
    Some(Line::Checkbox { checked, text })
}

// ---------------------------------------------------------------------------
// Decoder state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Legend,
    TaskBody,
    Dependencies,
    Complexity,
    Choices,
    Subtasks,
    /// Unknown subsection or after a `---` rule; lines are ignored
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChoiceOwner {
    Task,
    Subtask,
}

struct OpenChoice {
    choice: Choice,
    owner: ChoiceOwner,
    has_meta: bool,
}

struct Decoder {
    now: DateTime<Utc>,
    project: Project,
    project_description: Vec<String>,
    section: Section,
    task: Option<Task>,
    task_description: Vec<String>,
    choice: Option<OpenChoice>,
}

impl Decoder {
    fn new(now: DateTime<Utc>) -> Self {
        let mut project = Project::new("");
        project.created_at = now;
        project.updated_at = now;
        Decoder {
            now,
            project,
            project_description: Vec::new(),
            section: Section::Preamble,
            task: None,
            task_description: Vec::new(),
            choice: None,
        }
    }

    fn feed(&mut self, line_no: usize, raw: &str) -> Result<(), DecodeError> {
        let line = classify(raw);

        if self.choice.is_some() {
            if self.feed_choice(line) {
                return Ok(());
            }
            self.close_choice();
        }

        match line {
            Line::Blank => {}
            Line::Rule => {
                self.finish_task();
                self.section = Section::Other;
            }
            Line::Meta(text) => self.apply_meta(line_no, text),
            Line::ProjectTitle(name) => {
                if self.section == Section::Preamble && self.project.name.is_empty() {
                    self.project.name = unescape_line(name);
                } else {
                    debug!(line = line_no, "skipping stray project title");
                }
            }
            Line::TaskHeading(text) => {
                self.finish_task();
                match self.parse_heading(line_no, text)? {
                    Some(task) => {
                        self.task = Some(task);
                        self.section = Section::TaskBody;
                    }
                    None => {
                        debug!(line = line_no, "skipping malformed task heading");
                        self.section = Section::Other;
                    }
                }
            }
            Line::OtherHeading => {
                if self.task.is_none() {
                    self.section = Section::Legend;
                } else {
                    self.section = Section::Other;
                }
            }
            Line::Subsection(name) => self.open_subsection(line_no, name),
            Line::ChoiceQuestion(question) => self.open_choice(line_no, question),
            Line::Checkbox { checked, text } => self.add_subtask(line_no, checked, text),
            Line::EstimatedHours(value) => match (self.task.as_mut(), value.parse::<u32>()) {
                (Some(task), Ok(hours)) => task.estimated_hours = hours,
                _ => debug!(line = line_no, "skipping estimated hours line"),
            },
            Line::Bullet(text) => self.apply_bullet(line_no, text),
            Line::Text(text) => match self.section {
                Section::Preamble => self.project_description.push(description_line(text)),
                Section::TaskBody if self.task.is_some() => {
                    self.task_description.push(description_line(text))
                }
                _ => debug!(line = line_no, "skipping text outside a description"),
            },
        }
        Ok(())
    }

    /// Lines consumed by an open choice. Returns false when the line closes it.
    fn feed_choice(&mut self, line: Line<'_>) -> bool {
        let Some(open) = self.choice.as_mut() else {
            return false;
        };
        match line {
            Line::Meta(text) => {
                if let Some(pairs) = parse_meta(text) {
                    open.has_meta = true;
                    for (key, value) in pairs {
                        match key.as_str() {
                            "id" if !value.is_empty() => open.choice.id = value,
                            "created" => {
                                if let Some(ts) = parse_timestamp(&value) {
                                    open.choice.created_at = ts;
                                }
                            }
                            "resolved" => open.choice.resolved_at = parse_timestamp(&value),
                            _ => {}
                        }
                    }
                }
                true
            }
            Line::Checkbox { checked, text } => {
                let option = unescape_line(text);
                if checked {
                    open.choice.selected = Some(option.clone());
                }
                open.choice.options.push(option);
                true
            }
            Line::Text("Options:") => true,
            Line::Text(text) => match text.strip_prefix("Reasoning:") {
                Some(rest) => {
                    open.choice.reasoning = unescape_line(rest.strip_prefix(' ').unwrap_or(rest));
                    self.close_choice();
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn open_choice(&mut self, line_no: usize, question: &str) {
        let Some(task) = self.task.as_ref() else {
            debug!(line = line_no, "skipping choice outside a task");
            return;
        };
        let owner = if self.section == Section::Subtasks && !task.subtasks.is_empty() {
            ChoiceOwner::Subtask
        } else {
            ChoiceOwner::Task
        };
        self.choice = Some(OpenChoice {
            choice: Choice {
                id: generate_choice_id(),
                question: unescape_line(question),
                options: Vec::new(),
                selected: None,
                reasoning: String::new(),
                created_at: self.now,
                resolved_at: None,
            },
            owner,
            has_meta: false,
        });
    }

    fn close_choice(&mut self) {
        let Some(OpenChoice {
            mut choice,
            owner,
            has_meta,
        }) = self.choice.take()
        else {
            return;
        };
        // Without metadata, a selected option is the only resolution signal
        if !has_meta && choice.selected.is_some() && choice.resolved_at.is_none() {
            choice.resolved_at = Some(self.now);
        }
        let Some(task) = self.task.as_mut() else {
            return;
        };
        match (owner, task.subtasks.last_mut()) {
            (ChoiceOwner::Subtask, Some(subtask)) => subtask.choices.push(choice),
            _ => task.choices.push(choice),
        }
    }

    fn open_subsection(&mut self, line_no: usize, name: &str) {
        let Some(task) = self.task.as_mut() else {
            debug!(line = line_no, "skipping subsection outside a task");
            self.section = Section::Other;
            return;
        };
        self.section = if name.starts_with("Dependencies") {
            Section::Dependencies
        } else if let Some(rest) = name.strip_prefix("Complexity") {
            let value = rest.trim_start_matches(':').trim();
            if !value.is_empty() {
                match Complexity::from_str_exact(value) {
                    Some(c) => task.complexity = Some(c),
                    None => debug!(line = line_no, value, "skipping unknown complexity"),
                }
            }
            Section::Complexity
        } else if name.starts_with("Choices") {
            Section::Choices
        } else if name.starts_with("Subtasks") {
            Section::Subtasks
        } else {
            Section::Other
        };
    }

    fn add_subtask(&mut self, line_no: usize, checked: bool, title: &str) {
        match self.task.as_mut() {
            Some(task) if self.section == Section::Subtasks => {
                let mut subtask = Subtask::new(unescape_line(title));
                subtask.created_at = self.now;
                subtask.updated_at = self.now;
                if checked {
                    subtask.status = Status::Done;
                }
                task.subtasks.push(subtask);
            }
            _ => debug!(line = line_no, "skipping checkbox outside subtasks"),
        }
    }

    fn apply_bullet(&mut self, line_no: usize, text: &str) {
        let Some(task) = self.task.as_mut() else {
            return;
        };
        match self.section {
            Section::Subtasks => {
                let Some(subtask) = task.subtasks.last_mut() else {
                    debug!(line = line_no, "skipping subtask field without subtask");
                    return;
                };
                let Some((key, value)) = text.split_once(':') else {
                    debug!(line = line_no, "skipping subtask bullet");
                    return;
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match key.trim() {
                    "status" => match Status::from_str_exact(value.trim()) {
                        Some(status) => subtask.status = status,
                        None => debug!(line = line_no, value, "skipping unknown subtask status"),
                    },
                    "complexity" => match Complexity::from_str_exact(value.trim()) {
                        Some(c) => subtask.complexity = Some(c),
                        None => debug!(line = line_no, value, "skipping unknown complexity"),
                    },
                    "estimated hours" => match value.trim().parse::<u32>() {
                        Ok(hours) => subtask.estimated_hours = hours,
                        Err(_) => debug!(line = line_no, value, "skipping bad hours"),
                    },
                    "description" => subtask.description = unescape_line(value),
                    other => debug!(line = line_no, key = other, "skipping unknown subtask field"),
                }
            }
            Section::Choices => debug!(line = line_no, "skipping bullet in choices"),
            _ => match text
                .strip_prefix("Task ")
                .map(|id| id.trim().parse::<u32>())
            {
                Some(Ok(id)) => task.dependencies.push(id),
                _ => debug!(line = line_no, "skipping bullet"),
            },
        }
    }

    fn apply_meta(&mut self, line_no: usize, text: &str) {
        let Some(pairs) = parse_meta(text) else {
            debug!(line = line_no, "skipping malformed metadata comment");
            return;
        };
        let (created, updated) = match self.task.as_mut() {
            Some(task) => match task.subtasks.last_mut() {
                Some(subtask) if self.section == Section::Subtasks => {
                    (&mut subtask.created_at, &mut subtask.updated_at)
                }
                _ => (&mut task.created_at, &mut task.updated_at),
            },
            None if self.section == Section::Preamble => {
                (&mut self.project.created_at, &mut self.project.updated_at)
            }
            None => {
                debug!(line = line_no, "skipping metadata without an owner");
                return;
            }
        };
        for (key, value) in pairs {
            let target = match key.as_str() {
                "created" => &mut *created,
                "updated" => &mut *updated,
                _ => continue,
            };
            if let Some(ts) = parse_timestamp(&value) {
                *target = ts;
            }
        }
    }

    fn parse_heading(&self, line_no: usize, text: &str) -> Result<Option<Task>, DecodeError> {
        let Some(caps) = task_heading_re().captures(text) else {
            return Ok(None);
        };
        let raw_id = &caps[1];
        let id = raw_id
            .parse::<u32>()
            .map_err(|_| DecodeError::CorruptDocument {
                line: line_no,
                reason: format!("invalid task id '{}'", raw_id),
            })?;

        let mut task = Task::new(unescape_line(&caps[3]), "");
        task.id = id;
        task.created_at = self.now;
        task.updated_at = self.now;
        task.category = caps
            .get(2)
            .and_then(|c| Category::from_str_exact(&format!("[{}]", c.as_str())));
        task.priority = Priority::from_str_exact(caps[4].trim()).unwrap_or_default();
        task.status = caps
            .get(5)
            .and_then(|s| Status::from_str_exact(s.as_str().trim()))
            .unwrap_or_default();
        Ok(Some(task))
    }

    fn finish_task(&mut self) {
        self.close_choice();
        if let Some(mut task) = self.task.take() {
            task.description = std::mem::take(&mut self.task_description).join("\n");
            self.project.tasks.push(task);
        }
        self.task_description.clear();
    }

    fn finish(mut self) -> Project {
        self.finish_task();
        self.project.description = self.project_description.join("\n");
        self.project
    }
}
