//! Admin domain types
//!
//! Types for admin account management, task tracking and the document
//! verification queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profiles::DocumentSet;
use super::users::{AdminType, UserType};

/// Kind of administrative work a task represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DocumentVerification,
    ContentModeration,
    UserSupport,
    Other,
}

impl Default for TaskType {
    fn default() -> Self {
        Self::Other
    }
}

text_enum!(TaskType {
    DocumentVerification => "document_verification",
    ContentModeration => "content_moderation",
    UserSupport => "user_support",
    Other => "other",
});

/// Task status; any value may follow any other
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

text_enum!(TaskStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

text_enum!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Admin task entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub assigned_by: Uuid,
    pub assigned_to: Uuid,
    pub task_type: TaskType,
    pub related_user: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating an admin account
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    /// `super` or `normal`; anything else is rejected
    pub admin_type: String,
    #[serde(default)]
    pub admin_name: Option<String>,
    #[serde(default)]
    pub admin_position: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request DTO for replacing a normal admin's permissions
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<String>,
}

/// Request DTO for assigning a task
#[derive(Debug, Clone, Deserialize)]
pub struct AssignTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: Uuid,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub related_user: Option<Uuid>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Request DTO for a task status change
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
    #[serde(default)]
    pub completion_notes: Option<String>,
}

/// Request DTO for rejecting submitted documents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectDocumentsRequest {
    #[serde(default)]
    pub reason: String,
}

/// Admin's verdict on a user's documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentDecision {
    Verify,
    Reject { reason: String },
}

/// Entry in the pending verification queue
#[derive(Debug, Clone, Serialize)]
pub struct PendingVerification {
    pub user_id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub display_name: Option<String>,
    pub documents: DocumentSet,
    pub submitted_at: DateTime<Utc>,
}

/// Admin account listing entry
#[derive(Debug, Clone, Serialize)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
    pub admin_type: Option<AdminType>,
    pub permissions: Vec<String>,
    pub admin_name: Option<String>,
    pub admin_position: Option<String>,
    pub created_at: DateTime<Utc>,
}
