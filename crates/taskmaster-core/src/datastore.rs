use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::datetime::{iso_date_serde, parse_timestamp};
use crate::kv::KeyValueStore;
use crate::task::{Priority, Task, normalize_category, push_unique_tag};

pub const TASKS_KEY_PREFIX: &str = "tasks_";

/// Durable copy of every user's task collection, one key per user.
#[derive(Clone)]
pub struct TaskStore {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").finish_non_exhaustive()
    }
}

/// Shape accepted when reading older saves; only identity, title and
/// creation time are required. Empty strings in optional fields read as
/// unset, the same as a missing key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(with = "iso_date_serde")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl StoredTask {
    fn into_task(self) -> Option<Task> {
        let title = self.title.trim();
        if title.is_empty() {
            warn!(id = %self.id, "dropping stored task with blank title");
            return None;
        }

        let updated_at = lenient_timestamp(&self.id, "updatedAt", self.updated_at.as_deref())
            .unwrap_or(self.created_at)
            .max(self.created_at);
        let due_date = lenient_timestamp(&self.id, "dueDate", self.due_date.as_deref());

        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => Priority::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(id = %self.id, priority = raw, "unknown stored priority; using default");
                Priority::default()
            }),
        };

        let mut tags = Vec::new();
        for tag in self.tags.unwrap_or_default() {
            push_unique_tag(&mut tags, tag);
        }

        Some(Task {
            id: self.id,
            title: title.to_string(),
            description: self.description.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
            created_at: self.created_at,
            updated_at,
            priority,
            due_date,
            category: normalize_category(self.category.as_deref().unwrap_or_default()),
            tags,
        })
    }
}

fn lenient_timestamp(id: &str, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    match parse_timestamp(raw) {
        Ok(dt) => Some(dt),
        Err(err) => {
            warn!(id, field, error = %err, "unreadable stored timestamp; treating as unset");
            None
        }
    }
}

impl TaskStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn key_for(user_id: &str) -> String {
        format!("{TASKS_KEY_PREFIX}{user_id}")
    }

    /// Reads a user's tasks. Missing or unreadable data yields an empty list.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, user_id: &str) -> Vec<Task> {
        match self.try_load(user_id) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "stored tasks unreadable; starting empty");
                vec![]
            }
        }
    }

    /// Overwrites a user's tasks. Failures are logged, not returned.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save(&self, user_id: &str, tasks: &[Task]) {
        if let Err(err) = self.try_save(user_id, tasks) {
            error!(error = %format!("{err:#}"), "failed to save tasks");
        }
    }

    fn try_load(&self, user_id: &str) -> anyhow::Result<Vec<Task>> {
        let key = Self::key_for(user_id);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(vec![]);
        };

        let records: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing stored value for {key}"))?;

        let mut tasks = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<StoredTask>(record) {
                Ok(stored) => tasks.extend(stored.into_task()),
                Err(err) => warn!(index = idx, error = %err, "skipping undecodable stored task"),
            }
        }
        Ok(tasks)
    }

    fn try_save(&self, user_id: &str, tasks: &[Task]) -> anyhow::Result<()> {
        let key = Self::key_for(user_id);
        let serialized = serde_json::to_string(tasks)?;
        self.kv
            .set(&key, &serialized)
            .with_context(|| format!("failed writing {key}"))
    }
}
