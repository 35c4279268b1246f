//! Firm records. Every one of them belongs to exactly one tenant.
//!
//! `id` and `tenant_id` default when absent so inbound payloads can omit
//! them; the scoped repository assigns both.

use chrono::{DateTime, NaiveDate, Utc};
use docket_core::{scoped_entity, RecordId, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Client {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "email must be a valid email"))]
    pub email: Option<String>,
}

scoped_entity!(Client, "client");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Case {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub client_id: RecordId,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub status: CaseStatus,
}

scoped_entity!(Case, "case");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Deadline {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub case_id: RecordId,
    #[validate(length(min = 1, message = "label must not be empty"))]
    pub label: String,
    pub due_on: NaiveDate,
    #[serde(default)]
    pub done: bool,
}

scoped_entity!(Deadline, "deadline");

/// Document metadata only; the bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Document {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub case_id: RecordId,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub size_bytes: u64,
}

scoped_entity!(Document, "document");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeEntry {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub case_id: RecordId,
    #[validate(range(min = 1, max = 1440, message = "minutes must be between 1 and 1440"))]
    pub minutes: i64,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub note: String,
    #[serde(default = "Utc::now")]
    pub logged_at: DateTime<Utc>,
}

scoped_entity!(TimeEntry, "time_entry");

fn default_billable() -> bool {
    true
}

/// Entities that hang off a parent record of the same tenant.
pub trait Linked {
    fn parent_id(&self) -> &RecordId;
}

impl Linked for Case {
    fn parent_id(&self) -> &RecordId {
        &self.client_id
    }
}

impl Linked for Deadline {
    fn parent_id(&self) -> &RecordId {
        &self.case_id
    }
}

impl Linked for Document {
    fn parent_id(&self) -> &RecordId {
        &self.case_id
    }
}

impl Linked for TimeEntry {
    fn parent_id(&self) -> &RecordId {
        &self.case_id
    }
}
