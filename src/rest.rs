use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::error::SyncError;
use crate::models::{CreateTask, Employee, Task, ToggleEmployeeStatus, UpdateTask};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot returned by the per-employee task fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeTasks {
    pub employee: Employee,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Authenticated HTTP client for the task backend. Every request carries the
/// session's bearer token and a bounded timeout; an expired token surfaces as
/// `SyncError::Unauthorized` for the engine's central auth handler.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(RestClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_employees(&self, admin_id: i64) -> Result<Vec<Employee>, SyncError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/tasks/employees/{admin_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let employees: Vec<Employee> = checked(resp).await?.json().await?;
        info!(count = employees.len(), "Fetched employees");
        Ok(employees)
    }

    /// All tasks assigned under an admin scope, across employees.
    pub async fn fetch_assigned_tasks(&self, admin_id: i64) -> Result<Vec<Task>, SyncError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/tasks/assigned/{admin_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let tasks: Vec<Task> = checked(resp).await?.json().await?;
        info!(count = tasks.len(), "Fetched assigned tasks");
        Ok(tasks)
    }

    /// One employee's own view: their record plus their tasks.
    pub async fn fetch_employee_tasks(&self, employee_id: i64) -> Result<EmployeeTasks, SyncError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/tasks/employee/{employee_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn create_task(&self, req: &CreateTask) -> Result<Task, SyncError> {
        let resp = self
            .http
            .post(self.url("/api/tasks/create-task"))
            .bearer_auth(&self.token)
            .json(req)
            .send()
            .await?;
        let task: Task = checked(resp).await?.json().await?;
        info!(id = task.id, title = %task.title, "Created task");
        Ok(task)
    }

    pub async fn update_task(&self, id: i64, req: &UpdateTask) -> Result<Task, SyncError> {
        let resp = self
            .http
            .put(self.url(&format!("/api/tasks/{id}")))
            .bearer_auth(&self.token)
            .json(req)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), SyncError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/tasks/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        checked(resp).await?;
        info!(id, "Deleted task");
        Ok(())
    }

    /// Soft delete / reactivate; the record itself is never removed.
    pub async fn toggle_employee_status(
        &self,
        employee_id: i64,
        active: bool,
    ) -> Result<Employee, SyncError> {
        let resp = self
            .http
            .put(self.url(&format!("/api/employee/{employee_id}/status")))
            .bearer_auth(&self.token)
            .json(&ToggleEmployeeStatus { status: active })
            .send()
            .await?;
        let employee: Employee = checked(resp).await?.json().await?;
        info!(
            name = %employee.display_name(),
            active = employee.status,
            "Toggled employee status"
        );
        Ok(employee)
    }
}

async fn checked(resp: Response) -> Result<Response, SyncError> {
    match resp.status() {
        status if status.is_success() => Ok(resp),
        StatusCode::UNAUTHORIZED => Err(SyncError::Unauthorized),
        StatusCode::NOT_FOUND => Err(SyncError::NotFound),
        status => Err(SyncError::UnexpectedStatus(status.as_u16())),
    }
}
