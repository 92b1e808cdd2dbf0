use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, instrument};

use crate::error::{PermitError, PermitResult};
use crate::model::{
    leave_approval::Decision,
    leave_permit::{LeaveType, PermitStatus},
    user::UserProfile,
};
use crate::workflow::aggregate::LeavePermitAggregate;
use crate::workflow::approver_resolver::ApproverResolver;
use crate::workflow::ports::{
    AcademicDirectory, LeavePermitRepository, NewLeavePermit, PermitListQuery,
};
use crate::workflow::schedule_resolver::ScheduleResolver;
use crate::workflow::views::{
    ApprovalTask, ApprovalView, PermitDetail, PermitListResponse, PermitSummary,
};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePermitInput {
    pub leave_type: LeaveType,
    pub reason: String,
    pub start_time: DateTime<Utc>,
    pub estimated_return: Option<DateTime<Utc>>,
    pub group_member_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitFilter {
    pub status: Option<PermitStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Entry point of the leave-permit workflow. Cheap to clone; shared across workers.
#[derive(Clone)]
pub struct LeavePermitService {
    directory: Arc<dyn AcademicDirectory>,
    repository: Arc<dyn LeavePermitRepository>,
    schedules: ScheduleResolver,
    approvers: ApproverResolver,
}

impl LeavePermitService {
    pub fn new(
        directory: Arc<dyn AcademicDirectory>,
        repository: Arc<dyn LeavePermitRepository>,
        school_offset: FixedOffset,
    ) -> Self {
        Self {
            schedules: ScheduleResolver::new(directory.clone(), school_offset),
            approvers: ApproverResolver::new(directory.clone()),
            directory,
            repository,
        }
    }

    #[instrument(name = "permit_create", skip(self, input), fields(leave_type = %input.leave_type))]
    pub async fn create(
        &self,
        requester_id: u64,
        input: CreatePermitInput,
    ) -> PermitResult<LeavePermitAggregate> {
        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(PermitError::Validation("reason must not be empty".into()));
        }
        if let Some(back) = input.estimated_return {
            if back <= input.start_time {
                return Err(PermitError::Validation(
                    "estimated_return must be after start_time".into(),
                ));
            }
        }

        let year = self
            .directory
            .active_academic_year()
            .await?
            .ok_or(PermitError::NoActiveAcademicYear)?;

        let membership = self
            .directory
            .class_membership(requester_id, year.id)
            .await?
            .ok_or(PermitError::NoClassMembership)?;

        let group_member_ids = self
            .checked_group_members(
                requester_id,
                membership.class_id,
                year.id,
                input.leave_type,
                input.group_member_ids,
            )
            .await?;

        let schedule = self
            .schedules
            .resolve(input.start_time, membership.class_id, year.id)
            .await?;

        let approvers = self
            .approvers
            .resolve(membership.class_id, &schedule, year.id)
            .await?;

        let permit = NewLeavePermit {
            requester_id,
            leave_type: input.leave_type,
            reason,
            start_time: input.start_time,
            estimated_return: input.estimated_return,
            group_member_ids,
            academic_year_id: year.id,
            class_id: membership.class_id,
            related_schedule_id: schedule.id,
            created_at: Utc::now(),
        };

        let created = self.repository.create(permit, &approvers).await?;

        info!(
            permit_id = created.id(),
            schedule_id = schedule.id,
            approvers = created.approvals.len(),
            "Leave permit created"
        );

        Ok(created)
    }

    async fn checked_group_members(
        &self,
        requester_id: u64,
        class_id: u64,
        academic_year_id: u64,
        leave_type: LeaveType,
        requested: Vec<u64>,
    ) -> PermitResult<Vec<u64>> {
        let mut members: Vec<u64> = Vec::with_capacity(requested.len());
        for id in requested {
            if !members.contains(&id) {
                members.push(id);
            }
        }

        if members.is_empty() {
            return Ok(members);
        }
        if leave_type == LeaveType::Individual || members.contains(&requester_id) {
            return Err(PermitError::InvalidGroupMembers(members));
        }

        let classmates = self
            .directory
            .classmates_among(class_id, academic_year_id, &members)
            .await?;

        let strangers: Vec<u64> = members
            .iter()
            .copied()
            .filter(|id| !classmates.contains(id))
            .collect();

        if strangers.is_empty() {
            Ok(members)
        } else {
            Err(PermitError::InvalidGroupMembers(strangers))
        }
    }

    #[instrument(name = "permit_start_approval", skip(self))]
    pub async fn start_approval(
        &self,
        permit_id: u64,
        piket_id: u64,
    ) -> PermitResult<LeavePermitAggregate> {
        let updated = self
            .repository
            .update_permit(
                permit_id,
                Box::new(move |agg: &mut LeavePermitAggregate| {
                    agg.start_approval(piket_id, Utc::now())
                }),
            )
            .await?;

        info!(permit_id, piket_id, "Leave permit verified by front desk");
        Ok(updated)
    }

    #[instrument(name = "permit_decide", skip(self, notes))]
    pub async fn decide(
        &self,
        permit_id: u64,
        approver_id: u64,
        decision: Decision,
        notes: Option<String>,
    ) -> PermitResult<LeavePermitAggregate> {
        let updated = self
            .repository
            .update_permit(
                permit_id,
                Box::new(move |agg: &mut LeavePermitAggregate| {
                    agg.decide(approver_id, decision, notes, Utc::now())
                }),
            )
            .await?;

        info!(
            permit_id,
            approver_id,
            ?decision,
            status = %updated.status(),
            "Approval decision recorded"
        );
        Ok(updated)
    }

    #[instrument(name = "permit_complete", skip(self, notes))]
    pub async fn complete(
        &self,
        permit_id: u64,
        piket_id: u64,
        notes: Option<String>,
    ) -> PermitResult<LeavePermitAggregate> {
        let updated = self
            .repository
            .update_permit(
                permit_id,
                Box::new(move |agg: &mut LeavePermitAggregate| {
                    agg.complete(piket_id, notes, Utc::now())
                }),
            )
            .await?;

        info!(permit_id, piket_id, "Leave permit printed");
        Ok(updated)
    }

    pub async fn list(&self, filter: PermitFilter) -> PermitResult<PermitListResponse> {
        let query = PermitListQuery {
            status: filter.status,
            search: filter
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            page: filter.page.unwrap_or(1).max(1),
            per_page: filter
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        };

        self.repository.list(&query).await
    }

    /// Full permit view. Reviewers see everything; anyone else only permits they take part in.
    pub async fn detail(
        &self,
        permit_id: u64,
        viewer_id: u64,
        can_review: bool,
    ) -> PermitResult<PermitDetail> {
        let agg = self
            .repository
            .find(permit_id)
            .await?
            .ok_or(PermitError::PermitNotFound(permit_id))?;

        if !can_review && !agg.involves(viewer_id) {
            return Err(PermitError::Forbidden(
                "Not allowed to view this leave permit".into(),
            ));
        }

        let mut people: Vec<u64> = vec![agg.permit.requester_id];
        people.extend(agg.approvals.iter().map(|a| a.approver_user_id));
        people.extend(agg.permit.group_member_ids.iter().copied());
        people.sort_unstable();
        people.dedup();

        let profiles: HashMap<u64, UserProfile> = self
            .directory
            .user_profiles(&people)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let approvals = agg
            .approvals
            .iter()
            .map(|a| ApprovalView {
                approver_user_id: a.approver_user_id,
                approver_name: profiles
                    .get(&a.approver_user_id)
                    .map(|p| p.full_name.clone()),
                approver_role: a.approver_role,
                status: a.status,
                notes: a.notes.clone(),
                decided_at: a.decided_at,
            })
            .collect();

        let group_members = match agg.permit.leave_type {
            LeaveType::Group => agg
                .permit
                .group_member_ids
                .iter()
                .filter_map(|id| profiles.get(id).cloned())
                .collect(),
            LeaveType::Individual => Vec::new(),
        };

        Ok(PermitDetail {
            requester: profiles.get(&agg.permit.requester_id).cloned(),
            approvals,
            group_members,
            permit: agg.permit,
        })
    }

    pub async fn my_history(&self, requester_id: u64) -> PermitResult<Vec<PermitSummary>> {
        self.repository.list_by_requester(requester_id).await
    }

    pub async fn my_approvals(&self, approver_id: u64) -> PermitResult<Vec<ApprovalTask>> {
        self.repository.pending_for_approver(approver_id).await
    }
}
