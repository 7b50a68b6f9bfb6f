// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The resources exchanged with the tasks endpoints.

use time::format_description::BorrowedFormatItem;
use time::{Date, OffsetDateTime};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

pub(crate) const DEFAULT_PAGE: u32 = 1;
pub(crate) const DEFAULT_LIMIT: u32 = 50;

/// A task, as it appears in lists.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub subtasks_count: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl TaskSummary {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A task with its details.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A step within a task.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: i64,
    pub title: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Subtask {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// The completion state of a task, as returned after changing it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub id: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// One page of the tasks scheduled for a day.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TasksPage {
    pub data: Vec<TaskSummary>,
    /// The number of tasks across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    /// The number of completed tasks across all pages.
    #[serde(default)]
    pub completed: u64,
}

/// The request body to create a task.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "calendar_date")]
    pub date: Date,
    /// The titles of the subtasks created with the task.
    pub subtasks: Vec<String>,
}

impl NewTask {
    pub fn new<T: Into<String>>(title: T, date: Date) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            subtasks: Vec::new(),
        }
    }

    pub fn with_description<T: Into<String>>(mut self, v: T) -> Self {
        self.description = Some(v.into());
        self
    }

    pub fn with_subtasks<I, T>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.subtasks = v.into_iter().map(Into::into).collect();
        self
    }
}

/// Selects a page of the tasks scheduled for a day.
///
/// # Example
/// ```
/// # use ritmio_tasks::model::ListTasks;
/// let request = ListTasks::new(time::macros::date!(2025 - 03 - 01))
///     .with_page(2)
///     .with_completed(false);
/// assert_eq!(request.limit(), 50);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListTasks {
    date: Date,
    page: u32,
    limit: u32,
    completed: Option<bool>,
}

impl ListTasks {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            completed: None,
        }
    }

    /// Sets the page number, starting at 1.
    pub fn with_page(mut self, v: u32) -> Self {
        self.page = v;
        self
    }

    /// Sets the maximum number of tasks per page.
    pub fn with_limit(mut self, v: u32) -> Self {
        self.limit = v;
        self
    }

    /// Only returns completed (or pending) tasks.
    pub fn with_completed(mut self, v: bool) -> Self {
        self.completed = Some(v);
        self
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn completed(&self) -> Option<bool> {
        self.completed
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let date = self
            .date
            .format(DATE_FORMAT)
            .unwrap_or_else(|_| self.date.to_string());
        let mut query = vec![
            ("date", date),
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(completed) = self.completed {
            query.push(("completed", completed.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn tasks_page() -> anyhow::Result<()> {
        let page = serde_json::from_value::<TasksPage>(json!({
            "data": [
                {"id": 1, "title": "walk", "subtasksCount": 2, "completedAt": null},
                {"id": 2, "title": "read", "completedAt": "2025-03-01T18:30:00Z"},
            ],
            "total": 12,
            "page": 1,
            "limit": 2,
            "completed": 5,
        }))?;
        assert_eq!(page.data.len(), 2);
        assert!(!page.data[0].is_completed());
        assert_eq!(page.data[0].subtasks_count, 2);
        assert_eq!(page.data[1].subtasks_count, 0);
        assert_eq!(page.data[1].completed_at, Some(datetime!(2025-03-01 18:30 UTC)));
        assert_eq!((page.total, page.completed), (12, 5));
        Ok(())
    }

    #[test]
    fn task_without_description() -> anyhow::Result<()> {
        let task = serde_json::from_value::<Task>(json!({"id": 7, "title": "walk"}))?;
        assert_eq!(task.description, None);
        assert!(!task.is_completed());
        Ok(())
    }

    #[test]
    fn new_task() -> anyhow::Result<()> {
        let task = NewTask::new("walk", date!(2025 - 03 - 01))
            .with_description("around the park")
            .with_subtasks(["shoes", "leash"]);
        let got = serde_json::to_value(&task)?;
        assert_eq!(
            got,
            json!({
                "title": "walk",
                "description": "around the park",
                "date": "2025-03-01",
                "subtasks": ["shoes", "leash"],
            })
        );

        let got = serde_json::to_value(NewTask::new("walk", date!(2025 - 12 - 24)))?;
        assert_eq!(got["description"], serde_json::Value::Null);
        assert_eq!(got["date"], "2025-12-24");
        assert_eq!(got["subtasks"], json!([]));
        Ok(())
    }

    #[test]
    fn list_query() {
        let request = ListTasks::new(date!(2025 - 03 - 01));
        assert_eq!(
            request.query(),
            vec![
                ("date", "2025-03-01".to_string()),
                ("page", "1".to_string()),
                ("limit", "50".to_string()),
            ]
        );

        let request = request.with_page(3).with_limit(10).with_completed(true);
        assert_eq!(request.page(), 3);
        assert_eq!(request.limit(), 10);
        assert_eq!(request.completed(), Some(true));
        assert_eq!(
            request.query().last(),
            Some(&("completed", "true".to_string()))
        );
    }
}
