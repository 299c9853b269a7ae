use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub status: TaskStatus,
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub employee_ids: Vec<i64>,
    #[serde(default)]
    pub position: i64,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Changes the status while keeping `completion_date` consistent with it:
    /// set on transition to Completed, cleared on transition away from it.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == TaskStatus::Completed {
            self.completion_date.get_or_insert(now);
        } else {
            self.completion_date = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

// Display-only field; anything unrecognized falls back rather than failing
// the whole snapshot.
impl<'de> serde::Deserialize<'de> for Gender {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(match value.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Unspecified,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "unspecified")]
    pub gender: Gender,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(with = "int_bool")]
    pub status: bool,
}

fn unspecified() -> Gender {
    Gender::Unspecified
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Active/inactive travels as 0/1 on the wire.
mod int_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*value as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub subject_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    pub position: i64,
    pub admin_id: i64,
    #[serde(rename = "assignedEmployees")]
    pub assigned_employees: Vec<i64>,
}

/// Partial update. `completion_date` is always serialized so a transition out
/// of Completed sends an explicit null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl UpdateTask {
    /// Full field set for one task, the shape a reorder persists.
    pub fn from_task(task: &Task) -> Self {
        UpdateTask {
            title: Some(task.title.clone()),
            description: task.description.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            priority: task.priority,
            status: Some(task.status),
            completion_date: task.completion_date,
            position: Some(task.position),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleEmployeeStatus {
    #[serde(with = "int_bool")]
    pub status: bool,
}

/// Server-pushed message on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PushEvent {
    NewTask { task: Task },
    UpdateTask { task: Task },
    DeleteTask { id: i64 },
}

/// Client-sent message on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientFrame {
    Join { subject_id: i64 },
}

/// Transient user-facing message. Presentation is the consumer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    TaskAssigned { title: String },
    TaskUpdated { title: String },
    TaskRemoved { id: i64 },
    SessionExpired,
}
