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

use crate::Result;
use crate::errors::Error;
use crate::model::{ListTasks, NewTask, Subtask, Task, TaskCompletion, TasksPage};
use crate::supersede::Supersede;
use reqwest::{Method, RequestBuilder, Response};
use ritmio_auth::gateway::Gateway;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const TASKS_PATH: &str = "/users/me/tasks";

/// Manages the tasks of the signed-in user.
///
/// All requests are authenticated through the [Gateway], and benefit from its
/// refresh-and-retry handling of expired tokens.
///
/// # Example
/// ```no_run
/// # use ritmio_auth::config::ClientConfig;
/// # use ritmio_auth::controller::AuthController;
/// # use ritmio_auth::store::TokenStore;
/// # use ritmio_tasks::client::TasksClient;
/// # use ritmio_tasks::model::{ListTasks, NewTask};
/// # async fn sample() -> anyhow::Result<()> {
/// let controller = AuthController::new(ClientConfig::default(), TokenStore::in_memory());
/// controller.login("a@b.com", "secret1").await?;
///
/// let client = TasksClient::new(controller.gateway().clone());
/// let today = time::OffsetDateTime::now_utc().date();
/// client.create(&NewTask::new("walk the dog", today)).await?;
/// for task in client.list(&ListTasks::new(today)).await?.data {
///     println!("{} {}", task.id, task.title);
/// }
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct TasksClient {
    gateway: Gateway,
    lists: Arc<Supersede>,
}

#[derive(serde::Serialize)]
struct TaskUpdate<'a> {
    title: &'a str,
    description: Option<&'a str>,
}

#[derive(serde::Serialize)]
struct CompletionUpdate {
    completed: bool,
}

#[derive(serde::Serialize)]
struct NewSubtask<'a> {
    title: &'a str,
}

#[derive(serde::Deserialize)]
struct SubtaskList {
    subtasks: Vec<Subtask>,
}

impl TasksClient {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            lists: Arc::new(Supersede::new()),
        }
    }

    /// Fetches a page of the tasks scheduled for a day.
    ///
    /// Starting a new list cancels the one in flight, from this client or any
    /// of its clones. The cancelled call returns [Error::Superseded].
    pub async fn list(&self, request: &ListTasks) -> Result<TasksPage> {
        let builder = self
            .gateway
            .request(Method::GET, TASKS_PATH)
            .query(&request.query());
        self.lists.run(self.send(builder)).await
    }

    pub async fn get(&self, task_id: i64) -> Result<Task> {
        let builder = self.gateway.request(Method::GET, &task_path(task_id));
        self.send(builder).await
    }

    /// Creates a task.
    ///
    /// Any 2xx status means the task was created. The created task is
    /// returned when the response body describes it, and `None` otherwise.
    pub async fn create(&self, task: &NewTask) -> Result<Option<Task>> {
        let builder = self.gateway.request(Method::POST, TASKS_PATH).json(task);
        let response = self.execute(builder).await?;
        let body = response.bytes().await.map_err(Error::Body)?;
        match serde_json::from_slice::<Task>(&body) {
            Ok(created) => Ok(Some(created)),
            Err(e) => {
                tracing::debug!("task created, the response does not describe it: {e}");
                Ok(None)
            }
        }
    }

    /// Changes the title and description of a task.
    pub async fn update(
        &self,
        task_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task> {
        let builder = self
            .gateway
            .request(Method::PATCH, &task_path(task_id))
            .json(&TaskUpdate { title, description });
        self.send(builder).await
    }

    pub async fn set_completed(&self, task_id: i64, completed: bool) -> Result<TaskCompletion> {
        let builder = self
            .gateway
            .request(Method::PATCH, &task_path(task_id))
            .json(&CompletionUpdate { completed });
        self.send(builder).await
    }

    pub async fn delete(&self, task_id: i64) -> Result<()> {
        let builder = self.gateway.request(Method::DELETE, &task_path(task_id));
        self.execute(builder).await?;
        Ok(())
    }

    pub async fn subtasks(&self, task_id: i64) -> Result<Vec<Subtask>> {
        let builder = self
            .gateway
            .request(Method::GET, &subtasks_path(task_id));
        self.send(builder).await
    }

    pub async fn create_subtask(&self, task_id: i64, title: &str) -> Result<Subtask> {
        let builder = self
            .gateway
            .request(Method::POST, &subtasks_path(task_id))
            .json(&NewSubtask { title });
        self.send(builder).await
    }

    /// Marks a subtask as completed, or pending.
    ///
    /// Returns all the subtasks of the task, after the change.
    pub async fn set_subtask_completed(
        &self,
        task_id: i64,
        subtask_id: i64,
        completed: bool,
    ) -> Result<Vec<Subtask>> {
        let path = format!("{}/{subtask_id}", subtasks_path(task_id));
        let builder = self
            .gateway
            .request(Method::PATCH, &path)
            .json(&CompletionUpdate { completed });
        let list = self.send::<SubtaskList>(builder).await?;
        Ok(list.subtasks)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let body = response.bytes().await.map_err(Error::Body)?;
        serde_json::from_slice::<T>(&body).map_err(Error::Deserialization)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.gateway.execute(builder, None).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        tracing::debug!(%status, body = %message, "tasks request failed");
        Err(Error::Status { status, message })
    }
}

fn task_path(task_id: i64) -> String {
    format!("{TASKS_PATH}/{task_id}")
}

fn subtasks_path(task_id: i64) -> String {
    format!("{TASKS_PATH}/{task_id}/subtasks")
}

// Prefers the `message` field of JSON error bodies, and falls back to the raw
// body.
async fn error_message(response: Response) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) => text.trim().to_string(),
    }
}
