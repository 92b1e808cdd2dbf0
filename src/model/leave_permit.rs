use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Individual,
    Group,
}

/// Lifecycle of a permit.
///
/// `WaitingForPiket -> WaitingForApproval -> {Approved, Rejected}`, then `Approved -> Completed`.
/// Older rows may carry `PRINTED`, which reads back as `Completed`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PermitStatus {
    WaitingForPiket,
    WaitingForApproval,
    Approved,
    Rejected,
    #[serde(alias = "PRINTED")]
    #[strum(to_string = "COMPLETED", serialize = "PRINTED")]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeavePermit {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1042)]
    pub requester_id: u64,
    pub leave_type: LeaveType,
    #[schema(example = "Berobat ke puskesmas")]
    pub reason: String,
    #[schema(example = "2026-01-06T02:10:00Z", format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2026-01-06T04:00:00Z", format = "date-time", value_type = String, nullable = true)]
    pub estimated_return: Option<DateTime<Utc>>,
    /// Classmates leaving together, only for group permits
    #[schema(example = json!([1043, 1044]))]
    pub group_member_ids: Vec<u64>,
    #[schema(example = 7)]
    pub academic_year_id: u64,
    #[schema(example = 12)]
    pub class_id: u64,
    /// Lesson period in effect at `start_time`, resolved once at creation
    #[schema(example = 311)]
    pub related_schedule_id: u64,
    pub status: PermitStatus,
    #[schema(nullable = true)]
    pub verified_by_id: Option<u64>,
    #[schema(nullable = true)]
    pub printed_by_id: Option<u64>,
    #[schema(nullable = true)]
    pub completion_notes: Option<String>,
    #[schema(example = "2026-01-06T02:05:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-06T02:05:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn printed_reads_back_as_completed() {
        assert_eq!(
            PermitStatus::from_str("PRINTED").unwrap(),
            PermitStatus::Completed
        );
        assert_eq!(PermitStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(PermitStatus::WaitingForPiket.as_ref(), "WAITING_FOR_PIKET");
    }
}
