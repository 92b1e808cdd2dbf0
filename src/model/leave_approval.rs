use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Why a user sits on a permit's approver list. Declaration order is priority order.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverRole {
    HomeroomTeacher,
    SubjectTeacher,
    HeadOfStudentAffairs,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// An approver's verdict. `Pending` is not a decision, so it has no variant here.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for ApprovalStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => ApprovalStatus::Approved,
            Decision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveApproval {
    #[schema(example = 1)]
    pub leave_permit_id: u64,
    #[schema(example = 501)]
    pub approver_user_id: u64,
    pub approver_role: ApproverRole,
    pub status: ApprovalStatus,
    #[schema(example = "tidak sesuai", nullable = true)]
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
}

impl LeaveApproval {
    pub fn pending(leave_permit_id: u64, approver_user_id: u64, approver_role: ApproverRole) -> Self {
        Self {
            leave_permit_id,
            approver_user_id,
            approver_role,
            status: ApprovalStatus::Pending,
            notes: None,
            decided_at: None,
        }
    }
}
