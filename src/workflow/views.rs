use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{
    leave_approval::{ApprovalStatus, ApproverRole},
    leave_permit::{LeavePermit, LeaveType, PermitStatus},
    user::UserProfile,
};

/// One row of the permit list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PermitSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1042)]
    pub requester_id: u64,
    #[schema(example = "Budi Santoso")]
    pub requester_name: String,
    pub leave_type: LeaveType,
    pub reason: String,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub estimated_return: Option<DateTime<Utc>>,
    pub status: PermitStatus,
    #[schema(example = 3)]
    pub approvals_total: i64,
    #[schema(example = 1)]
    pub approvals_approved: i64,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PermitListResponse {
    pub data: Vec<PermitSummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// An approver's outstanding decision.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ApprovalTask {
    #[schema(example = 1)]
    pub leave_permit_id: u64,
    pub approver_role: ApproverRole,
    #[schema(example = 1042)]
    pub requester_id: u64,
    #[schema(example = "Budi Santoso")]
    pub requester_name: String,
    pub leave_type: LeaveType,
    pub reason: String,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub estimated_return: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ApprovalView {
    pub approver_user_id: u64,
    #[schema(nullable = true)]
    pub approver_name: Option<String>,
    pub approver_role: ApproverRole,
    pub status: ApprovalStatus,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Full permit with resolved people.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PermitDetail {
    pub permit: LeavePermit,
    #[schema(nullable = true)]
    pub requester: Option<UserProfile>,
    pub approvals: Vec<ApprovalView>,
    /// Profiles of the classmates on a group permit
    pub group_members: Vec<UserProfile>,
}
