use chrono::{DateTime, Utc};

use crate::task::{DEFAULT_CATEGORY, NewTask, Priority, Task, TaskPatch, push_unique_tag};

/// Editable state behind the add/edit task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub category: String,
    pub tags: Vec<String>,
    pub tag_input: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            due_date: None,
            category: DEFAULT_CATEGORY.to_string(),
            tags: vec![],
            tag_input: String::new(),
        }
    }
}

impl TaskDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the form with an existing task for editing.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            category: task.category.clone(),
            tags: task.tags.clone(),
            tag_input: String::new(),
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Moves the pending tag input into `tags`.
    ///
    /// The input is kept when it is blank or already present so the user can
    /// correct it.
    pub fn commit_tag_input(&mut self) -> bool {
        let tag = self.tag_input.trim().to_string();
        if tag.is_empty() {
            return false;
        }
        if push_unique_tag(&mut self.tags, tag) {
            self.tag_input.clear();
            true
        } else {
            false
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn clear_due_date(&mut self) {
        self.due_date = None;
    }

    /// Returns the creation request, or `None` when the title is blank.
    pub fn to_new_task(&self) -> Option<NewTask> {
        if !self.can_submit() {
            return None;
        }
        Some(NewTask {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            due_date: self.due_date,
            category: self.category.trim().to_string(),
            tags: self.tags.clone(),
        })
    }

    /// Returns a patch that rewrites every editable field, or `None` when the
    /// title is blank.
    pub fn to_patch(&self) -> Option<TaskPatch> {
        let request = self.to_new_task()?;
        Some(TaskPatch {
            title: Some(request.title),
            description: Some(request.description),
            completed: None,
            priority: Some(request.priority),
            due_date: Some(request.due_date),
            category: Some(request.category),
            tags: Some(request.tags),
        })
    }

    /// Back to an empty form after a successful add.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::TaskDraft;
    use crate::task::{NewTask, Priority, Task};

    #[test]
    fn blank_title_cannot_submit() {
        let mut draft = TaskDraft::new();
        draft.title = " \t".to_string();
        assert!(!draft.can_submit());
        assert!(draft.to_new_task().is_none());
        assert!(draft.to_patch().is_none());
    }

    #[test]
    fn tag_input_is_trimmed_and_deduplicated() {
        let mut draft = TaskDraft::new();
        draft.tag_input = "  urgent ".to_string();
        assert!(draft.commit_tag_input());
        assert!(draft.tag_input.is_empty());

        draft.tag_input = "urgent".to_string();
        assert!(!draft.commit_tag_input());
        assert_eq!(draft.tag_input, "urgent");
        assert_eq!(draft.tags, vec!["urgent".to_string()]);

        draft.remove_tag("urgent");
        assert!(draft.tags.is_empty());
    }

    #[test]
    fn submission_trims_text_fields() {
        let mut draft = TaskDraft::new();
        draft.title = "  Pay rent ".to_string();
        draft.description = " monthly \n".to_string();
        draft.category = " Home ".to_string();
        draft.priority = Priority::High;

        let request = draft.to_new_task().expect("submittable");
        assert_eq!(request.title, "Pay rent");
        assert_eq!(request.description, "monthly");
        assert_eq!(request.category, "Home");
        assert_eq!(request.priority, Priority::High);

        draft.reset();
        assert_eq!(draft, TaskDraft::new());
    }

    #[test]
    fn editing_round_trips_through_a_patch() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid now");
        let mut request = NewTask::new("Original");
        request.due_date = Some(now);
        request.tags = vec!["a".to_string()];
        let task = Task::create(request, now).expect("task");

        let mut draft = TaskDraft::from_task(&task);
        draft.title = "Renamed".to_string();
        draft.clear_due_date();

        let patch = draft.to_patch().expect("patch");
        assert_eq!(patch.title.as_deref(), Some("Renamed"));
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.tags, Some(vec!["a".to_string()]));
        assert_eq!(patch.completed, None);
    }
}
