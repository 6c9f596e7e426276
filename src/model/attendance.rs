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
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    #[schema(value_type = String, example = "2024-01-10")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
}

/// Attendance row joined with its owner, used by the admin report.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEntry {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub department: Option<String>,
    #[schema(value_type = String, example = "2024-01-10")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}
