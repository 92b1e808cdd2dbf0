use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{PermitError, PermitResult};
use crate::model::{
    leave_approval::{ApprovalStatus, Decision, LeaveApproval},
    leave_permit::{LeavePermit, PermitStatus},
};

/// A permit together with every approval row that belongs to it.
///
/// All lifecycle transitions go through this type so that the rules are the same
/// whichever repository loaded it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeavePermitAggregate {
    pub permit: LeavePermit,
    pub approvals: Vec<LeaveApproval>,
}

/// Permit-level status implied by the individual approvals.
///
/// A single rejection decides the outcome. Otherwise the permit is approved only once
/// every approver has approved.
pub fn aggregate_status<I>(statuses: I) -> PermitStatus
where
    I: IntoIterator<Item = ApprovalStatus>,
{
    let mut any = false;
    let mut all_approved = true;

    for status in statuses {
        any = true;
        match status {
            ApprovalStatus::Rejected => return PermitStatus::Rejected,
            ApprovalStatus::Approved => {}
            ApprovalStatus::Pending => all_approved = false,
        }
    }

    if any && all_approved {
        PermitStatus::Approved
    } else {
        PermitStatus::WaitingForApproval
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

impl LeavePermitAggregate {
    pub fn id(&self) -> u64 {
        self.permit.id
    }

    pub fn status(&self) -> PermitStatus {
        self.permit.status
    }

    fn require_status(&self, expected: PermitStatus, action: &'static str) -> PermitResult<()> {
        if self.permit.status == expected {
            Ok(())
        } else {
            Err(PermitError::InvalidStatusTransition {
                from: self.permit.status,
                action,
            })
        }
    }

    /// Front desk has seen the student; approvers may now decide.
    pub fn start_approval(&mut self, piket_id: u64, now: DateTime<Utc>) -> PermitResult<()> {
        self.require_status(PermitStatus::WaitingForPiket, "start approval of")?;

        self.permit.status = PermitStatus::WaitingForApproval;
        self.permit.verified_by_id = Some(piket_id);
        self.permit.updated_at = now;
        Ok(())
    }

    /// Records one approver's decision and recomputes the permit status.
    ///
    /// On error nothing is modified.
    pub fn decide(
        &mut self,
        approver_id: u64,
        decision: Decision,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> PermitResult<()> {
        self.require_status(PermitStatus::WaitingForApproval, "decide on")?;

        let approval = self
            .approvals
            .iter_mut()
            .find(|a| a.approver_user_id == approver_id)
            .ok_or(PermitError::ApprovalNotFound)?;

        if approval.status != ApprovalStatus::Pending {
            return Err(PermitError::AlreadyDecided(approval.status));
        }

        let notes = clean_notes(notes);
        if decision == Decision::Rejected && notes.is_none() {
            return Err(PermitError::NotesRequired("reject a permit"));
        }

        approval.status = decision.into();
        approval.notes = notes;
        approval.decided_at = Some(now);

        self.permit.status = aggregate_status(self.approvals.iter().map(|a| a.status));
        self.permit.updated_at = now;
        Ok(())
    }

    /// Finalization gate: an approved permit is printed and closed by the front desk.
    pub fn complete(
        &mut self,
        piket_id: u64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> PermitResult<()> {
        self.require_status(PermitStatus::Approved, "print")?;

        let notes = clean_notes(notes).ok_or(PermitError::NotesRequired("complete a permit"))?;

        self.permit.status = PermitStatus::Completed;
        self.permit.printed_by_id = Some(piket_id);
        self.permit.completion_notes = Some(notes);
        self.permit.updated_at = now;
        Ok(())
    }

    pub fn is_approver(&self, user_id: u64) -> bool {
        self.approvals.iter().any(|a| a.approver_user_id == user_id)
    }

    /// Requester, group members and approvers may read a permit without review rights.
    pub fn involves(&self, user_id: u64) -> bool {
        self.permit.requester_id == user_id
            || self.permit.group_member_ids.contains(&user_id)
            || self.is_approver(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_approval::ApproverRole;
    use crate::model::leave_permit::LeaveType;
    use ApprovalStatus::*;

    fn aggregate(status: PermitStatus, approvers: &[u64]) -> LeavePermitAggregate {
        let now = Utc::now();
        LeavePermitAggregate {
            permit: LeavePermit {
                id: 1,
                requester_id: 100,
                leave_type: LeaveType::Individual,
                reason: "Sakit".into(),
                start_time: now,
                estimated_return: None,
                group_member_ids: vec![],
                academic_year_id: 1,
                class_id: 10,
                related_schedule_id: 5,
                status,
                verified_by_id: None,
                printed_by_id: None,
                completion_notes: None,
                created_at: now,
                updated_at: now,
            },
            approvals: approvers
                .iter()
                .map(|id| LeaveApproval::pending(1, *id, ApproverRole::SubjectTeacher))
                .collect(),
        }
    }

    #[test]
    fn any_rejection_wins() {
        assert_eq!(aggregate_status([Approved, Rejected, Pending]), PermitStatus::Rejected);
        assert_eq!(aggregate_status([Pending, Rejected]), PermitStatus::Rejected);
    }

    #[test]
    fn approved_only_when_all_approved() {
        assert_eq!(aggregate_status([Approved, Approved]), PermitStatus::Approved);
        assert_eq!(
            aggregate_status([Approved, Pending]),
            PermitStatus::WaitingForApproval
        );
        assert_eq!(
            aggregate_status(Vec::<ApprovalStatus>::new()),
            PermitStatus::WaitingForApproval
        );
    }

    #[test]
    fn start_approval_requires_waiting_for_piket() {
        let mut agg = aggregate(PermitStatus::WaitingForPiket, &[1]);
        agg.start_approval(9, Utc::now()).unwrap();
        assert_eq!(agg.status(), PermitStatus::WaitingForApproval);
        assert_eq!(agg.permit.verified_by_id, Some(9));

        let err = agg.start_approval(9, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn decisions_accumulate_until_all_approve() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1, 2]);

        agg.decide(1, Decision::Approved, None, Utc::now()).unwrap();
        assert_eq!(agg.status(), PermitStatus::WaitingForApproval);

        agg.decide(2, Decision::Approved, Some("ok".into()), Utc::now())
            .unwrap();
        assert_eq!(agg.status(), PermitStatus::Approved);
        assert!(agg.approvals.iter().all(|a| a.decided_at.is_some()));
    }

    #[test]
    fn rejection_closes_permit_for_other_approvers() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1, 2]);

        agg.decide(1, Decision::Rejected, Some("tidak sesuai".into()), Utc::now())
            .unwrap();
        assert_eq!(agg.status(), PermitStatus::Rejected);

        let before = agg.clone();
        let err = agg.decide(2, Decision::Approved, None, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PermitError::InvalidStatusTransition {
                from: PermitStatus::Rejected,
                ..
            }
        ));
        assert_eq!(agg, before);
    }

    #[test]
    fn second_decision_by_same_approver_is_refused() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1, 2]);
        agg.decide(1, Decision::Approved, None, Utc::now()).unwrap();

        let before = agg.clone();
        let err = agg.decide(1, Decision::Approved, None, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::AlreadyDecided(Approved)));
        assert_eq!(agg, before);
    }

    #[test]
    fn rejection_without_notes_is_refused() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1]);
        let err = agg
            .decide(1, Decision::Rejected, Some("   ".into()), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PermitError::NotesRequired(_)));
        assert_eq!(agg.approvals[0].status, Pending);
    }

    #[test]
    fn bare_rejection_after_approving_is_already_decided() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1, 2]);
        agg.decide(1, Decision::Approved, None, Utc::now()).unwrap();

        let before = agg.clone();
        let err = agg.decide(1, Decision::Rejected, None, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::AlreadyDecided(Approved)));
        assert_eq!(agg, before);
    }

    #[test]
    fn stranger_rejecting_without_notes_is_not_an_approver() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1, 2]);
        let err = agg.decide(42, Decision::Rejected, None, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::ApprovalNotFound));
    }

    #[test]
    fn strangers_cannot_decide() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1]);
        let err = agg.decide(42, Decision::Approved, None, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::ApprovalNotFound));
    }

    #[test]
    fn printing_requires_an_approved_permit() {
        let mut agg = aggregate(PermitStatus::WaitingForApproval, &[1]);
        let err = agg
            .complete(9, Some("dicetak".into()), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PermitError::InvalidStatusTransition { .. }));

        agg.decide(1, Decision::Approved, None, Utc::now()).unwrap();
        let err = agg.complete(9, None, Utc::now()).unwrap_err();
        assert!(matches!(err, PermitError::NotesRequired(_)));

        agg.complete(9, Some("dicetak".into()), Utc::now()).unwrap();
        assert_eq!(agg.status(), PermitStatus::Completed);
        assert_eq!(agg.permit.printed_by_id, Some(9));

        // closed for good
        let err = agg
            .complete(9, Some("dicetak lagi".into()), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            PermitError::InvalidStatusTransition {
                from: PermitStatus::Completed,
                ..
            }
        ));
    }
}
