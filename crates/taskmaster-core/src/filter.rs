use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
  #[default]
  All,
  Completed,
  Pending,
  HighPriority,
  Overdue
}

impl StatusFilter {
  /// Order the filter buttons are shown
  /// in.
  pub const DISPLAY_ORDER: [StatusFilter;
    5] = [
    StatusFilter::All,
    StatusFilter::Pending,
    StatusFilter::Completed,
    StatusFilter::HighPriority,
    StatusFilter::Overdue
  ];

  pub fn key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Completed => "completed",
      | Self::Pending => "pending",
      | Self::HighPriority => {
        "high-priority"
      }
      | Self::Overdue => "overdue"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::All => "All",
      | Self::Completed => "Completed",
      | Self::Pending => "Pending",
      | Self::HighPriority => {
        "High Priority"
      }
      | Self::Overdue => "Overdue"
    }
  }

  pub fn matches(
    self,
    task: &Task,
    now: DateTime<Utc>
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Completed => {
        task.completed
      }
      | Self::Pending => {
        !task.completed
      }
      | Self::HighPriority => {
        task.priority == Priority::High
          && !task.completed
      }
      | Self::Overdue => {
        task.is_overdue(now)
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.key())
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let key = s
      .trim()
      .to_ascii_lowercase();
    Self::DISPLAY_ORDER
      .into_iter()
      .find(|filter| {
        filter.key() == key
      })
      .ok_or_else(|| {
        anyhow::anyhow!(
          "invalid status filter \
           '{key}': expected \
           all|completed|pending|\
           high-priority|overdue"
        )
      })
  }
}

/// Per-status totals over the whole
/// collection. The search term never
/// applies here.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub struct TaskCounts {
  pub all:           usize,
  pub completed:     usize,
  pub pending:       usize,
  pub high_priority: usize,
  pub overdue:       usize
}

impl TaskCounts {
  pub fn get(
    &self,
    filter: StatusFilter
  ) -> usize {
    match filter {
      | StatusFilter::All => self.all,
      | StatusFilter::Completed => {
        self.completed
      }
      | StatusFilter::Pending => {
        self.pending
      }
      | StatusFilter::HighPriority => {
        self.high_priority
      }
      | StatusFilter::Overdue => {
        self.overdue
      }
    }
  }
}

/// Case-insensitive substring match on
/// title, description, category and
/// tags. An empty term matches
/// everything.
pub fn matches_search(
  task: &Task,
  term: &str
) -> bool {
  if term.is_empty() {
    return true;
  }

  let needle = term.to_lowercase();
  let hit = |text: &str| {
    text
      .to_lowercase()
      .contains(&needle)
  };

  hit(&task.title)
    || hit(&task.description)
    || hit(&task.category)
    || task
      .tags
      .iter()
      .any(|tag| hit(tag))
}

#[tracing::instrument(skip(
  tasks, now
))]
pub fn filter_tasks<'a>(
  tasks: &'a [Task],
  filter: StatusFilter,
  search_term: &str,
  now: DateTime<Utc>
) -> Vec<&'a Task> {
  let visible: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      matches_search(task, search_term)
    })
    .filter(|task| {
      filter.matches(task, now)
    })
    .collect();

  trace!(
    total = tasks.len(),
    visible = visible.len(),
    "filtered tasks"
  );
  visible
}

pub fn count_tasks(
  tasks: &[Task],
  now: DateTime<Utc>
) -> TaskCounts {
  let count = |filter: StatusFilter| {
    tasks
      .iter()
      .filter(|task| {
        filter.matches(task, now)
      })
      .count()
  };

  TaskCounts {
    all:           tasks.len(),
    completed:     count(
      StatusFilter::Completed
    ),
    pending:       count(
      StatusFilter::Pending
    ),
    high_priority: count(
      StatusFilter::HighPriority
    ),
    overdue:       count(
      StatusFilter::Overdue
    )
  }
}

/// Message a view shows when nothing is
/// visible.
pub fn empty_state_message(
  filter: StatusFilter,
  total: usize,
  search_term: &str
) -> String {
  if filter == StatusFilter::All
    && total == 0
  {
    "No tasks yet. Create your first \
     task to get started!"
      .to_string()
  } else if !search_term.is_empty() {
    format!(
      "No tasks found matching \
       \"{search_term}\""
    )
  } else {
    format!(
      "No {} tasks found.",
      filter.key()
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    StatusFilter,
    count_tasks,
    empty_state_message,
    filter_tasks,
    matches_search
  };
  use crate::task::{
    NewTask,
    Priority,
    Task
  };

  fn fixed_now() -> chrono::DateTime<Utc>
  {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .single()
      .expect("valid now")
  }

  // A: pending, high, due yesterday
  // B: completed
  // C: pending, due tomorrow
  fn sample() -> Vec<Task> {
    let now = fixed_now();

    let mut a = NewTask::new("A");
    a.priority = Priority::High;
    a.due_date =
      Some(now - Duration::days(1));

    let b = NewTask::new("B");

    let mut c = NewTask::new("C");
    c.due_date =
      Some(now + Duration::days(1));

    let a =
      Task::create(a, now).expect("a");
    let mut b =
      Task::create(b, now).expect("b");
    b.completed = true;
    let c =
      Task::create(c, now).expect("c");

    vec![a, b, c]
  }

  fn titles(
    tasks: Vec<&Task>
  ) -> Vec<&str> {
    tasks
      .into_iter()
      .map(|t| t.title.as_str())
      .collect()
  }

  #[test]
  fn each_status_filter_selects_expected_tasks()
   {
    let tasks = sample();
    let now = fixed_now();

    assert_eq!(
      titles(filter_tasks(
        &tasks,
        StatusFilter::All,
        "",
        now
      )),
      vec!["A", "B", "C"]
    );
    assert_eq!(
      titles(filter_tasks(
        &tasks,
        StatusFilter::Overdue,
        "",
        now
      )),
      vec!["A"]
    );
    assert_eq!(
      titles(filter_tasks(
        &tasks,
        StatusFilter::HighPriority,
        "",
        now
      )),
      vec!["A"]
    );
    assert_eq!(
      titles(filter_tasks(
        &tasks,
        StatusFilter::Completed,
        "",
        now
      )),
      vec!["B"]
    );
    assert_eq!(
      titles(filter_tasks(
        &tasks,
        StatusFilter::Pending,
        "",
        now
      )),
      vec!["A", "C"]
    );
  }

  #[test]
  fn unmatched_search_hides_everything()
  {
    let tasks = sample();
    let now = fixed_now();
    for filter in
      StatusFilter::DISPLAY_ORDER
    {
      assert!(
        filter_tasks(
          &tasks, filter, "xyz", now
        )
        .is_empty()
      );
    }
  }

  #[test]
  fn counts_ignore_filter_and_search() {
    let tasks = sample();
    let counts =
      count_tasks(&tasks, fixed_now());

    assert_eq!(counts.all, tasks.len());
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.high_priority, 1);
    assert_eq!(counts.overdue, 1);
    assert_eq!(
      counts
        .get(StatusFilter::Overdue),
      1
    );
  }

  #[test]
  fn search_covers_every_text_field() {
    let now = fixed_now();
    let mut request =
      NewTask::new("Buy Milk");
    request.description =
      "Whole, organic".to_string();
    request.category =
      "Errands".to_string();
    request.tags =
      vec!["Grocery".to_string()];
    let task = Task::create(request, now)
      .expect("task");

    assert!(matches_search(&task, ""));
    assert!(matches_search(
      &task, "milk"
    ));
    assert!(matches_search(
      &task, "ORGANIC"
    ));
    assert!(matches_search(
      &task, "errand"
    ));
    assert!(matches_search(
      &task, "grocer"
    ));
    assert!(!matches_search(
      &task, "bread"
    ));
    assert!(!matches_search(
      &task, " milk "
    ));
  }

  #[test]
  fn filter_keys_round_trip() {
    for filter in
      StatusFilter::DISPLAY_ORDER
    {
      assert_eq!(
        filter
          .key()
          .parse::<StatusFilter>()
          .expect("parse"),
        filter
      );
    }
    assert!(
      "done"
        .parse::<StatusFilter>()
        .is_err()
    );
    assert_eq!(
      serde_json::to_string(
        &StatusFilter::HighPriority
      )
      .expect("json"),
      "\"high-priority\""
    );
  }

  #[test]
  fn empty_state_wording() {
    assert_eq!(
      empty_state_message(
        StatusFilter::All,
        0,
        ""
      ),
      "No tasks yet. Create your \
       first task to get started!"
    );
    assert_eq!(
      empty_state_message(
        StatusFilter::All,
        3,
        "xyz"
      ),
      "No tasks found matching \"xyz\""
    );
    assert_eq!(
      empty_state_message(
        StatusFilter::HighPriority,
        3,
        ""
      ),
      "No high-priority tasks found."
    );
    assert_eq!(
      empty_state_message(
        StatusFilter::Completed,
        0,
        ""
      ),
      "No completed tasks found."
    );
  }
}
