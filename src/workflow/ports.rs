use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PermitResult;
use crate::model::{
    academic::{AcademicYear, ClassMembership},
    leave_permit::{LeaveType, PermitStatus},
    role::Role,
    schedule::Schedule,
    user::UserProfile,
};
use crate::workflow::aggregate::LeavePermitAggregate;
use crate::workflow::approver_resolver::Approver;
use crate::workflow::views::{ApprovalTask, PermitListResponse, PermitSummary};

/// Read-only view of the school's academic structure and staff roles.
#[async_trait]
pub trait AcademicDirectory: Send + Sync {
    async fn active_academic_year(&self) -> PermitResult<Option<AcademicYear>>;

    async fn class_membership(
        &self,
        student_id: u64,
        academic_year_id: u64,
    ) -> PermitResult<Option<ClassMembership>>;

    /// Returns the subset of `candidate_ids` enrolled in `class_id` for the given year.
    async fn classmates_among(
        &self,
        class_id: u64,
        academic_year_id: u64,
        candidate_ids: &[u64],
    ) -> PermitResult<Vec<u64>>;

    async fn homeroom_teacher(&self, class_id: u64, academic_year_id: u64)
    -> PermitResult<Option<u64>>;

    /// Lesson periods of a class on one ISO weekday (1 = Monday).
    async fn schedules_on(
        &self,
        class_id: u64,
        academic_year_id: u64,
        day_of_week: u8,
    ) -> PermitResult<Vec<Schedule>>;

    async fn users_with_role(&self, role: Role) -> PermitResult<Vec<u64>>;

    async fn user_profiles(&self, user_ids: &[u64]) -> PermitResult<Vec<UserProfile>>;
}

/// Everything needed to persist a new permit, minus the storage-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeavePermit {
    pub requester_id: u64,
    pub leave_type: LeaveType,
    pub reason: String,
    pub start_time: DateTime<Utc>,
    pub estimated_return: Option<DateTime<Utc>>,
    pub group_member_ids: Vec<u64>,
    pub academic_year_id: u64,
    pub class_id: u64,
    pub related_schedule_id: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitListQuery {
    pub status: Option<PermitStatus>,
    /// Case-insensitive substring of the requester's full name
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl PermitListQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// A change applied to a permit while the repository holds its lock.
pub type PermitMutation =
    Box<dyn FnOnce(&mut LeavePermitAggregate) -> PermitResult<()> + Send + 'static>;

#[async_trait]
pub trait LeavePermitRepository: Send + Sync {
    /// Stores the permit and one pending approval per approver, all or nothing.
    async fn create(
        &self,
        permit: NewLeavePermit,
        approvers: &[Approver],
    ) -> PermitResult<LeavePermitAggregate>;

    async fn find(&self, permit_id: u64) -> PermitResult<Option<LeavePermitAggregate>>;

    /// Loads the permit under an exclusive lock, applies `mutation` and persists the
    /// result before releasing the lock. If `mutation` fails nothing is written.
    async fn update_permit(
        &self,
        permit_id: u64,
        mutation: PermitMutation,
    ) -> PermitResult<LeavePermitAggregate>;

    async fn list(&self, query: &PermitListQuery) -> PermitResult<PermitListResponse>;

    async fn list_by_requester(&self, requester_id: u64) -> PermitResult<Vec<PermitSummary>>;

    /// Pending approvals of `approver_id` on permits that are open for decisions.
    async fn pending_for_approver(&self, approver_id: u64) -> PermitResult<Vec<ApprovalTask>>;
}
