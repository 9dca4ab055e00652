use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::iso_date_serde;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            other => anyhow::bail!("invalid priority '{other}': must be low, medium, or high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    pub description: String,

    pub completed: bool,

    #[serde(with = "iso_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "iso_date_serde")]
    pub updated_at: DateTime<Utc>,

    pub priority: Priority,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date_serde::option"
    )]
    pub due_date: Option<DateTime<Utc>>,

    pub category: String,

    pub tags: Vec<String>,
}

impl Task {
    /// Builds a fresh task from a creation request.
    ///
    /// Returns `None` when the title is blank after trimming; nothing is
    /// constructed in that case.
    pub fn create(request: NewTask, now: DateTime<Utc>) -> Option<Self> {
        let title = request.title.trim();
        if title.is_empty() {
            return None;
        }

        let mut task = Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: request.description,
            completed: false,
            created_at: now,
            updated_at: now,
            priority: request.priority,
            due_date: request.due_date,
            category: normalize_category(&request.category),
            tags: vec![],
        };
        for tag in request.tags {
            task.add_tag(tag);
        }
        Some(task)
    }

    /// Appends `tag` unless an identical tag is already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        push_unique_tag(&mut self.tags, tag.into())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| now > due)
    }

    /// Views only show an "updated" stamp once the task has been touched.
    pub fn was_edited(&self) -> bool {
        self.updated_at > self.created_at
    }

    /// Merges the set fields of `patch` and refreshes `updated_at`.
    ///
    /// `updated_at` moves even when no field changed. A blank title in the
    /// patch is ignored so a task never loses its title.
    pub fn apply_patch(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                tracing::warn!(id = %self.id, "ignoring blank title in task patch");
            } else {
                self.title = trimmed.to_string();
            }
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(category) = patch.category {
            self.category = normalize_category(&category);
        }
        if let Some(tags) = patch.tags {
            self.tags.clear();
            for tag in tags {
                self.add_tag(tag);
            }
        }

        self.updated_at = now.max(self.created_at);
    }
}

/// Fields needed to create a task. Defaults mirror an untouched form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub category: String,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            due_date: None,
            category: DEFAULT_CATEGORY.to_string(),
            tags: vec![],
        }
    }
}

/// Partial update over a fixed set of fields. `None` leaves a field alone;
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn push_unique_tag(tags: &mut Vec<String>, tag: String) -> bool {
    if tags.contains(&tag) {
        return false;
    }
    tags.push(tag);
    true
}
