//! In-memory stand-ins for the MySQL adapters, used by unit and HTTP tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};

use crate::error::{PermitError, PermitResult};
use crate::model::{
    academic::{AcademicYear, ClassMembership},
    leave_approval::{ApprovalStatus, LeaveApproval},
    leave_permit::{LeavePermit, PermitStatus},
    role::Role,
    schedule::Schedule,
    user::UserProfile,
};
use crate::workflow::aggregate::LeavePermitAggregate;
use crate::workflow::approver_resolver::Approver;
use crate::workflow::ports::{
    AcademicDirectory, LeavePermitRepository, NewLeavePermit, PermitListQuery, PermitMutation,
};
use crate::workflow::views::{ApprovalTask, PermitListResponse, PermitSummary};

pub const YEAR: u64 = 1;
pub const CLASS: u64 = 10;
pub const OTHER_CLASS: u64 = 11;

pub const STUDENT: u64 = 100;
pub const CLASSMATE: u64 = 101;
pub const CLASSMATE_2: u64 = 102;
pub const OUTSIDER: u64 = 200;

pub const HOMEROOM: u64 = 501;
pub const SUBJECT_TEACHER: u64 = 502;
pub const WAKA: u64 = 503;
pub const PIKET: u64 = 600;

/// Tuesday 09:00-09:45, taught by `SUBJECT_TEACHER`
pub const TUESDAY_PERIOD: u64 = 311;
/// Monday 07:30-08:15, taught by the homeroom teacher
pub const MONDAY_PERIOD: u64 = 312;

pub fn wib() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

/// Tuesday 2026-01-06 09:10 WIB
pub fn tuesday_0910() -> chrono::DateTime<Utc> {
    wib()
        .with_ymd_and_hms(2026, 1, 6, 9, 10, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// Monday 2026-01-05 07:45 WIB
pub fn monday_0745() -> chrono::DateTime<Utc> {
    wib()
        .with_ymd_and_hms(2026, 1, 5, 7, 45, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn period(id: u64, day: u8, start: (u32, u32), end: (u32, u32), teacher: u64) -> Schedule {
    Schedule {
        id,
        day_of_week: day,
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        academic_year_id: YEAR,
        teaching_assignment_id: id + 1000,
        teacher_id: teacher,
        class_id: CLASS,
        subject_id: 3,
    }
}

fn profile(id: u64, name: &str, nis: Option<&str>) -> UserProfile {
    UserProfile {
        id,
        full_name: name.to_string(),
        nis: nis.map(str::to_string),
    }
}

pub struct FakeDirectory {
    pub active_year: Option<AcademicYear>,
    pub memberships: Vec<ClassMembership>,
    pub homerooms: HashMap<u64, u64>,
    pub schedules: Vec<Schedule>,
    pub role_holders: Vec<(u64, Role)>,
    pub profiles: Vec<UserProfile>,
}

impl FakeDirectory {
    /// One active year, two classes, a full timetable slot on Monday and Tuesday.
    pub fn school() -> Self {
        let seat = |student_id, class_id| ClassMembership {
            student_id,
            class_id,
            academic_year_id: YEAR,
        };

        Self {
            active_year: Some(AcademicYear {
                id: YEAR,
                name: "2025/2026".into(),
            }),
            memberships: vec![
                seat(STUDENT, CLASS),
                seat(CLASSMATE, CLASS),
                seat(CLASSMATE_2, CLASS),
                seat(OUTSIDER, OTHER_CLASS),
            ],
            homerooms: HashMap::from([(CLASS, HOMEROOM)]),
            schedules: vec![
                period(TUESDAY_PERIOD, 2, (9, 0), (9, 45), SUBJECT_TEACHER),
                period(MONDAY_PERIOD, 1, (7, 30), (8, 15), HOMEROOM),
            ],
            role_holders: vec![
                (HOMEROOM, Role::Teacher),
                (SUBJECT_TEACHER, Role::Teacher),
                (WAKA, Role::Waka),
                (PIKET, Role::Piket),
            ],
            profiles: vec![
                profile(STUDENT, "Budi Santoso", Some("2324101")),
                profile(CLASSMATE, "Siti Rahmawati", Some("2324102")),
                profile(CLASSMATE_2, "Andi Pratama", Some("2324103")),
                profile(OUTSIDER, "Dewi Lestari", Some("2324201")),
                profile(HOMEROOM, "Ibu Wulan", None),
                profile(SUBJECT_TEACHER, "Pak Joko", None),
                profile(WAKA, "Pak Hendra", None),
                profile(PIKET, "Ibu Rina", None),
            ],
        }
    }

    pub fn names(&self) -> HashMap<u64, String> {
        self.profiles
            .iter()
            .map(|p| (p.id, p.full_name.clone()))
            .collect()
    }
}

#[async_trait]
impl AcademicDirectory for FakeDirectory {
    async fn active_academic_year(&self) -> PermitResult<Option<AcademicYear>> {
        Ok(self.active_year.clone())
    }

    async fn class_membership(
        &self,
        student_id: u64,
        academic_year_id: u64,
    ) -> PermitResult<Option<ClassMembership>> {
        Ok(self
            .memberships
            .iter()
            .find(|m| m.student_id == student_id && m.academic_year_id == academic_year_id)
            .copied())
    }

    async fn classmates_among(
        &self,
        class_id: u64,
        academic_year_id: u64,
        candidate_ids: &[u64],
    ) -> PermitResult<Vec<u64>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.class_id == class_id && m.academic_year_id == academic_year_id)
            .map(|m| m.student_id)
            .filter(|id| candidate_ids.contains(id))
            .collect())
    }

    async fn homeroom_teacher(
        &self,
        class_id: u64,
        _academic_year_id: u64,
    ) -> PermitResult<Option<u64>> {
        Ok(self.homerooms.get(&class_id).copied())
    }

    async fn schedules_on(
        &self,
        class_id: u64,
        academic_year_id: u64,
        day_of_week: u8,
    ) -> PermitResult<Vec<Schedule>> {
        Ok(self
            .schedules
            .iter()
            .filter(|s| {
                s.class_id == class_id
                    && s.academic_year_id == academic_year_id
                    && s.day_of_week == day_of_week
            })
            .cloned()
            .collect())
    }

    async fn users_with_role(&self, role: Role) -> PermitResult<Vec<u64>> {
        Ok(self
            .role_holders
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn user_profiles(&self, user_ids: &[u64]) -> PermitResult<Vec<UserProfile>> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| user_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct Store {
    next_id: u64,
    permits: BTreeMap<u64, LeavePermitAggregate>,
}

/// Keeps permits in a map behind one mutex, which also serializes `update_permit`.
pub struct InMemoryPermitRepository {
    store: Mutex<Store>,
    names: HashMap<u64, String>,
}

impl InMemoryPermitRepository {
    pub fn new(names: HashMap<u64, String>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            names,
        }
    }

    fn lock(&self) -> PermitResult<std::sync::MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| PermitError::Internal("permit store poisoned".into()))
    }

    fn summary(&self, agg: &LeavePermitAggregate) -> PermitSummary {
        let p = &agg.permit;
        PermitSummary {
            id: p.id,
            requester_id: p.requester_id,
            requester_name: self.names.get(&p.requester_id).cloned().unwrap_or_default(),
            leave_type: p.leave_type,
            reason: p.reason.clone(),
            start_time: p.start_time,
            estimated_return: p.estimated_return,
            status: p.status,
            approvals_total: agg.approvals.len() as i64,
            approvals_approved: agg
                .approvals
                .iter()
                .filter(|a| a.status == ApprovalStatus::Approved)
                .count() as i64,
            created_at: p.created_at,
        }
    }

    /// Puts a permit straight into a given state, bypassing the workflow.
    pub fn force_status(&self, permit_id: u64, status: PermitStatus) {
        let mut store = self.lock().unwrap();
        store.permits.get_mut(&permit_id).unwrap().permit.status = status;
    }
}

#[async_trait]
impl LeavePermitRepository for InMemoryPermitRepository {
    async fn create(
        &self,
        new: NewLeavePermit,
        approvers: &[Approver],
    ) -> PermitResult<LeavePermitAggregate> {
        if approvers.is_empty() {
            return Err(PermitError::Internal("permit without approvers".into()));
        }

        let mut store = self.lock()?;
        store.next_id += 1;
        let id = store.next_id;

        let agg = LeavePermitAggregate {
            permit: LeavePermit {
                id,
                requester_id: new.requester_id,
                leave_type: new.leave_type,
                reason: new.reason,
                start_time: new.start_time,
                estimated_return: new.estimated_return,
                group_member_ids: new.group_member_ids,
                academic_year_id: new.academic_year_id,
                class_id: new.class_id,
                related_schedule_id: new.related_schedule_id,
                status: PermitStatus::WaitingForPiket,
                verified_by_id: None,
                printed_by_id: None,
                completion_notes: None,
                created_at: new.created_at,
                updated_at: new.created_at,
            },
            approvals: approvers
                .iter()
                .map(|a| LeaveApproval::pending(id, a.user_id, a.role))
                .collect(),
        };

        store.permits.insert(id, agg.clone());
        Ok(agg)
    }

    async fn find(&self, permit_id: u64) -> PermitResult<Option<LeavePermitAggregate>> {
        Ok(self.lock()?.permits.get(&permit_id).cloned())
    }

    async fn update_permit(
        &self,
        permit_id: u64,
        mutation: PermitMutation,
    ) -> PermitResult<LeavePermitAggregate> {
        let mut store = self.lock()?;
        let current = store
            .permits
            .get(&permit_id)
            .ok_or(PermitError::PermitNotFound(permit_id))?;

        let mut next = current.clone();
        mutation(&mut next)?;
        store.permits.insert(permit_id, next.clone());
        Ok(next)
    }

    async fn list(&self, query: &PermitListQuery) -> PermitResult<PermitListResponse> {
        let store = self.lock()?;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let mut rows: Vec<PermitSummary> = store
            .permits
            .values()
            .filter(|agg| query.status.is_none_or(|s| agg.permit.status == s))
            .map(|agg| self.summary(agg))
            .filter(|row| {
                needle
                    .as_ref()
                    .is_none_or(|n| row.requester_name.to_lowercase().contains(n.as_str()))
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len() as i64;
        let data = rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();

        Ok(PermitListResponse {
            data,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn list_by_requester(&self, requester_id: u64) -> PermitResult<Vec<PermitSummary>> {
        let store = self.lock()?;
        let mut rows: Vec<PermitSummary> = store
            .permits
            .values()
            .filter(|agg| agg.permit.requester_id == requester_id)
            .map(|agg| self.summary(agg))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn pending_for_approver(&self, approver_id: u64) -> PermitResult<Vec<ApprovalTask>> {
        let store = self.lock()?;
        Ok(store
            .permits
            .values()
            .filter(|agg| agg.permit.status == PermitStatus::WaitingForApproval)
            .filter_map(|agg| {
                let approval = agg.approvals.iter().find(|a| {
                    a.approver_user_id == approver_id && a.status == ApprovalStatus::Pending
                })?;
                let p = &agg.permit;
                Some(ApprovalTask {
                    leave_permit_id: p.id,
                    approver_role: approval.approver_role,
                    requester_id: p.requester_id,
                    requester_name: self.names.get(&p.requester_id).cloned().unwrap_or_default(),
                    leave_type: p.leave_type,
                    reason: p.reason.clone(),
                    start_time: p.start_time,
                    estimated_return: p.estimated_return,
                    created_at: p.created_at,
                })
            })
            .collect())
    }
}
