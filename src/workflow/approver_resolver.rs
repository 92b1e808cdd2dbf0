use std::sync::Arc;

use tracing::warn;

use crate::error::{PermitError, PermitResult};
use crate::model::{leave_approval::ApproverRole, role::Role, schedule::Schedule};
use crate::workflow::ports::AcademicDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approver {
    pub user_id: u64,
    pub role: ApproverRole,
}

/// Keeps the first occurrence of every user, so a person filling several slots keeps
/// the label of the highest-priority one.
pub fn dedupe_approvers<I>(candidates: I) -> Vec<Approver>
where
    I: IntoIterator<Item = Approver>,
{
    let mut approvers: Vec<Approver> = Vec::with_capacity(3);
    for candidate in candidates {
        if !approvers.iter().any(|a| a.user_id == candidate.user_id) {
            approvers.push(candidate);
        }
    }
    approvers
}

#[derive(Clone)]
pub struct ApproverResolver {
    directory: Arc<dyn AcademicDirectory>,
}

impl ApproverResolver {
    pub fn new(directory: Arc<dyn AcademicDirectory>) -> Self {
        Self { directory }
    }

    /// Homeroom teacher, the period's subject teacher and the head of student affairs,
    /// in that priority order, without duplicates.
    pub async fn resolve(
        &self,
        class_id: u64,
        schedule: &Schedule,
        academic_year_id: u64,
    ) -> PermitResult<Vec<Approver>> {
        let homeroom = self
            .directory
            .homeroom_teacher(class_id, academic_year_id)
            .await?
            .ok_or(PermitError::NoHomeroomTeacher(class_id))?;

        let affairs_head = self.affairs_head().await?;

        Ok(dedupe_approvers([
            Approver {
                user_id: homeroom,
                role: ApproverRole::HomeroomTeacher,
            },
            Approver {
                user_id: schedule.teacher_id,
                role: ApproverRole::SubjectTeacher,
            },
            Approver {
                user_id: affairs_head,
                role: ApproverRole::HeadOfStudentAffairs,
            },
        ]))
    }

    async fn affairs_head(&self) -> PermitResult<u64> {
        let mut holders = self.directory.users_with_role(Role::Waka).await?;
        holders.sort_unstable();
        holders.dedup();

        match holders.as_slice() {
            [] => Err(PermitError::NoAffairsHeadUser),
            [only] => Ok(*only),
            [first, ..] => {
                warn!(holders = ?holders, "Several head of student affairs users, using the lowest id");
                Ok(*first)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approver(user_id: u64, role: ApproverRole) -> Approver {
        Approver { user_id, role }
    }

    #[test]
    fn distinct_people_each_get_a_row() {
        let approvers = dedupe_approvers([
            approver(1, ApproverRole::HomeroomTeacher),
            approver(2, ApproverRole::SubjectTeacher),
            approver(3, ApproverRole::HeadOfStudentAffairs),
        ]);
        assert_eq!(approvers.len(), 3);
    }

    #[test]
    fn shared_person_keeps_highest_priority_label() {
        let approvers = dedupe_approvers([
            approver(7, ApproverRole::HomeroomTeacher),
            approver(2, ApproverRole::SubjectTeacher),
            approver(7, ApproverRole::HeadOfStudentAffairs),
        ]);
        assert_eq!(
            approvers,
            vec![
                approver(7, ApproverRole::HomeroomTeacher),
                approver(2, ApproverRole::SubjectTeacher),
            ]
        );
    }

    #[test]
    fn one_person_in_every_slot() {
        let approvers = dedupe_approvers([
            approver(5, ApproverRole::HomeroomTeacher),
            approver(5, ApproverRole::SubjectTeacher),
            approver(5, ApproverRole::HeadOfStudentAffairs),
        ]);
        assert_eq!(approvers, vec![approver(5, ApproverRole::HomeroomTeacher)]);
    }
}
