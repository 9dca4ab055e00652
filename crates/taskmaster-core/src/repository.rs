use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::datastore::TaskStore;
use crate::task::{NewTask, Task, TaskPatch};

/// Authoritative in-memory task list for one logged-in user.
///
/// Tasks are kept newest-first. Every mutation hands the whole list to the
/// [`TaskStore`] before returning.
#[derive(Debug)]
pub struct TaskRepository {
    user_id: String,
    tasks: Vec<Task>,
    store: TaskStore,
}

impl TaskRepository {
    #[tracing::instrument(skip(store))]
    pub fn open(store: TaskStore, user_id: &str) -> Self {
        let tasks = store.load(user_id);
        info!(count = tasks.len(), "opened task repository");
        Self {
            user_id: user_id.to_string(),
            tasks,
            store,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Creates a task at the top of the list. A blank title is a no-op.
    #[tracing::instrument(skip(self, request), fields(user = %self.user_id))]
    pub fn add(&mut self, request: NewTask, now: DateTime<Utc>) -> Option<&Task> {
        let Some(task) = Task::create(request, now) else {
            debug!("rejected task with blank title");
            return None;
        };

        debug!(id = %task.id, "adding task");
        self.tasks.insert(0, task);
        self.persist();
        self.tasks.first()
    }

    /// Applies `patch` to the task with `id`; unknown ids are ignored.
    #[tracing::instrument(skip(self, patch), fields(user = %self.user_id))]
    pub fn update(&mut self, id: &str, patch: TaskPatch, now: DateTime<Utc>) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("update for unknown task ignored");
            return false;
        };

        task.apply_patch(patch, now);
        self.persist();
        true
    }

    #[tracing::instrument(skip(self), fields(user = %self.user_id))]
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!("delete for unknown task ignored");
            return false;
        }

        self.persist();
        true
    }

    #[tracing::instrument(skip(self), fields(user = %self.user_id))]
    pub fn toggle_complete(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(completed) = self.get(id).map(|task| task.completed) else {
            debug!("toggle for unknown task ignored");
            return false;
        };
        self.update(id, TaskPatch::completed(!completed), now)
    }

    fn persist(&self) {
        self.store.save(&self.user_id, &self.tasks);
    }
}
