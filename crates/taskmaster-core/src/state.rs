use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::config::{Config, StorageBackend, resolve_data_dir};
use crate::datastore::TaskStore;
use crate::datetime;
use crate::filter::{StatusFilter, TaskCounts, count_tasks, empty_state_message, filter_tasks};
use crate::kv::{FileStore, KeyValueStore, MemoryStore};
use crate::repository::TaskRepository;
use crate::session::{Preferences, Session, Theme};
use crate::task::{NewTask, Task, TaskPatch};

/// Everything a view renders after a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView<'a> {
    pub tasks: Vec<&'a Task>,
    pub counts: TaskCounts,
    pub filter: StatusFilter,
    pub search_term: &'a str,
    pub empty_message: Option<String>,
}

/// Process-wide state: one store handle shared by the session, the
/// preferences and the active user's repository.
pub struct AppState {
    kv: Arc<dyn KeyValueStore>,
    session: Session,
    preferences: Preferences,
    repository: Option<TaskRepository>,
    default_filter: StatusFilter,
    filter: StatusFilter,
    search_term: String,
}

impl AppState {
    /// Restores session and theme from `kv` and opens the logged-in user's
    /// tasks, if any.
    #[instrument(skip(kv))]
    pub fn init(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::init_with_filter(kv, StatusFilter::default())
    }

    #[instrument(skip(kv))]
    pub fn init_with_filter(kv: Arc<dyn KeyValueStore>, default_filter: StatusFilter) -> Self {
        let session = Session::restore(kv.clone());
        let preferences = Preferences::restore(kv.clone());
        let repository = session
            .username()
            .map(|user| TaskRepository::open(TaskStore::new(kv.clone()), user));

        info!(
            logged_in = session.is_logged_in(),
            dark_mode = preferences.dark_mode(),
            "initialized app state"
        );

        Self {
            kv,
            session,
            preferences,
            repository,
            default_filter,
            filter: default_filter,
            search_term: String::new(),
        }
    }

    /// Builds the configured substrate, then [`AppState::init_with_filter`].
    #[instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let kv: Arc<dyn KeyValueStore> = match cfg.storage_backend()? {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => {
                let data_dir = resolve_data_dir(cfg).context("failed to resolve data directory")?;
                let store = FileStore::open(&data_dir).with_context(|| {
                    format!("failed to open file store at {}", data_dir.display())
                })?;
                Arc::new(store)
            }
        };
        Ok(Self::init_with_filter(kv, cfg.default_filter()?))
    }

    pub fn username(&self) -> Option<&str> {
        self.session.username()
    }

    pub fn theme(&self) -> Theme {
        self.preferences.theme()
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn repository(&self) -> Option<&TaskRepository> {
        self.repository.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        self.repository
            .as_ref()
            .map(TaskRepository::tasks)
            .unwrap_or_default()
    }

    /// Switches the session to `username` and loads that user's tasks.
    #[instrument(skip(self))]
    pub fn login(&mut self, username: &str) -> anyhow::Result<()> {
        let user = self.session.login(username)?.to_string();
        self.repository = Some(TaskRepository::open(TaskStore::new(self.kv.clone()), &user));
        self.reset_view();
        Ok(())
    }

    /// Ends the session. Stored tasks stay where they are.
    #[instrument(skip(self))]
    pub fn logout(&mut self) {
        self.session.logout();
        self.repository = None;
        self.reset_view();
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.preferences.set_dark_mode(dark);
    }

    pub fn toggle_dark_mode(&mut self) -> Theme {
        self.preferences.toggle_dark_mode()
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        debug!(%filter, "filter changed");
        self.filter = filter;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn add_task(&mut self, request: NewTask) -> Option<&Task> {
        let now = datetime::now();
        self.repository.as_mut()?.add(request, now)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        let now = datetime::now();
        self.repository
            .as_mut()
            .is_some_and(|repo| repo.update(id, patch, now))
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        self.repository
            .as_mut()
            .is_some_and(|repo| repo.delete(id))
    }

    pub fn toggle_complete(&mut self, id: &str) -> bool {
        let now = datetime::now();
        self.repository
            .as_mut()
            .is_some_and(|repo| repo.toggle_complete(id, now))
    }

    /// Visible tasks and counts as of `now`.
    pub fn view(&self, now: DateTime<Utc>) -> TaskView<'_> {
        let tasks = self.tasks();
        let visible = filter_tasks(tasks, self.filter, &self.search_term, now);
        let empty_message = visible
            .is_empty()
            .then(|| empty_state_message(self.filter, tasks.len(), &self.search_term));

        TaskView {
            tasks: visible,
            counts: count_tasks(tasks, now),
            filter: self.filter,
            search_term: &self.search_term,
            empty_message,
        }
    }

    fn reset_view(&mut self) {
        self.filter = self.default_filter;
        self.search_term.clear();
    }
}
