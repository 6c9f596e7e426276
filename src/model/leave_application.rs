use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, Display, EnumString,
    AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// The two terminal states an admin may move a pending application into.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, EnumString, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveDecision {
    Approved,
    Rejected,
}

impl From<LeaveDecision> for LeaveStatus {
    fn from(decision: LeaveDecision) -> Self {
        match decision {
            LeaveDecision::Approved => LeaveStatus::Approved,
            LeaveDecision::Rejected => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    pub id: i64,
    pub user_id: i64,
    #[schema(value_type = String, example = "2024-01-10")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, example = "2024-01-12")]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub admin_comment: Option<String>,
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
}

/// Leave application joined with the applicant, used by the admin queue.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveWithApplicant {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub name: String,
    #[schema(value_type = String, example = "2024-01-10")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, example = "2024-01-12")]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub admin_comment: Option<String>,
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
}
