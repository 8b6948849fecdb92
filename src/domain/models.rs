use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Hr,
    Manager,
    Employee,
    Panel,
}

impl UserRole {
    #[cfg(test)]
    pub const ALL: [UserRole; 4] = [
        UserRole::Hr,
        UserRole::Manager,
        UserRole::Employee,
        UserRole::Panel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Hr => "HR",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
            UserRole::Panel => "PANEL",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "cycle_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CycleStatus {
    Draft,
    Open,
    Closed,
    Finalized,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Draft => "DRAFT",
            CycleStatus::Open => "OPEN",
            CycleStatus::Closed => "CLOSED",
            CycleStatus::Finalized => "FINALIZED",
        }
    }
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "nomination_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NominationStatus {
    Draft,
    Submitted,
    HrReview,
    PanelReview,
    Finalized,
}

impl NominationStatus {
    #[cfg(test)]
    pub const ALL: [NominationStatus; 5] = [
        NominationStatus::Draft,
        NominationStatus::Submitted,
        NominationStatus::HrReview,
        NominationStatus::PanelReview,
        NominationStatus::Finalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NominationStatus::Draft => "DRAFT",
            NominationStatus::Submitted => "SUBMITTED",
            NominationStatus::HrReview => "HR_REVIEW",
            NominationStatus::PanelReview => "PANEL_REVIEW",
            NominationStatus::Finalized => "FINALIZED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NominationStatus::Finalized)
    }
}

impl std::fmt::Display for NominationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "field_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Select,
    MultiSelect,
    Radio,
    Checkbox,
    Rating,
    Date,
    Boolean,
    File,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Textarea => "TEXTAREA",
            FieldType::Number => "NUMBER",
            FieldType::Select => "SELECT",
            FieldType::MultiSelect => "MULTI_SELECT",
            FieldType::Radio => "RADIO",
            FieldType::Checkbox => "CHECKBOX",
            FieldType::Rating => "RATING",
            FieldType::Date => "DATE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::File => "FILE",
        }
    }
}

/// Public profile of an account; credentials live in `db::DbUser`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub employee_code: Option<String>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cycle {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quarter: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Form {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormField {
    pub id: Uuid,
    pub form_id: Uuid,
    pub label: String,
    pub field_key: String,
    pub field_type: FieldType,
    pub is_required: bool,
    pub order_index: i32,
    pub options: Option<serde_json::Value>,
    pub ui_schema: Option<serde_json::Value>,
    pub validation_rules: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Nomination {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub form_id: Uuid,
    pub nominee_id: Uuid,
    pub nominated_by_id: Uuid,
    pub status: NominationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormAnswer {
    pub id: Uuid,
    pub nomination_id: Uuid,
    pub field_key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PanelReview {
    pub id: Uuid,
    pub nomination_id: Uuid,
    pub panel_member_id: Uuid,
    pub score: i32,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Award {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub nomination_id: Uuid,
    pub winner_id: Uuid,
    pub award_type: Option<String>,
    pub rank: Option<i32>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}
