use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySqlConnection, MySqlPool};

use crate::error::{PermitError, PermitResult};
use crate::model::{
    leave_approval::LeaveApproval,
    leave_permit::{LeavePermit, PermitStatus},
};
use crate::repository::{db_error, parse_column, placeholders};
use crate::workflow::aggregate::LeavePermitAggregate;
use crate::workflow::approver_resolver::Approver;
use crate::workflow::ports::{
    LeavePermitRepository, NewLeavePermit, PermitListQuery, PermitMutation,
};
use crate::workflow::views::{ApprovalTask, PermitListResponse, PermitSummary};

#[derive(FromRow)]
struct PermitRow {
    id: u64,
    requester_id: u64,
    leave_type: String,
    reason: String,
    start_time: DateTime<Utc>,
    estimated_return: Option<DateTime<Utc>>,
    academic_year_id: u64,
    class_id: u64,
    related_schedule_id: u64,
    status: String,
    verified_by_id: Option<u64>,
    printed_by_id: Option<u64>,
    completion_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermitRow {
    fn into_permit(self, group_member_ids: Vec<u64>) -> PermitResult<LeavePermit> {
        Ok(LeavePermit {
            id: self.id,
            requester_id: self.requester_id,
            leave_type: parse_column("leave_type", &self.leave_type)?,
            reason: self.reason,
            start_time: self.start_time,
            estimated_return: self.estimated_return,
            group_member_ids,
            academic_year_id: self.academic_year_id,
            class_id: self.class_id,
            related_schedule_id: self.related_schedule_id,
            status: parse_column("status", &self.status)?,
            verified_by_id: self.verified_by_id,
            printed_by_id: self.printed_by_id,
            completion_notes: self.completion_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ApprovalRow {
    leave_permit_id: u64,
    approver_user_id: u64,
    approver_role: String,
    status: String,
    notes: Option<String>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<ApprovalRow> for LeaveApproval {
    type Error = PermitError;

    fn try_from(row: ApprovalRow) -> PermitResult<Self> {
        Ok(LeaveApproval {
            leave_permit_id: row.leave_permit_id,
            approver_user_id: row.approver_user_id,
            approver_role: parse_column("approver_role", &row.approver_role)?,
            status: parse_column("status", &row.status)?,
            notes: row.notes,
            decided_at: row.decided_at,
        })
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: u64,
    requester_id: u64,
    requester_name: String,
    leave_type: String,
    reason: String,
    start_time: DateTime<Utc>,
    estimated_return: Option<DateTime<Utc>>,
    status: String,
    approvals_total: i64,
    approvals_approved: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for PermitSummary {
    type Error = PermitError;

    fn try_from(row: SummaryRow) -> PermitResult<Self> {
        Ok(PermitSummary {
            id: row.id,
            requester_id: row.requester_id,
            requester_name: row.requester_name,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            reason: row.reason,
            start_time: row.start_time,
            estimated_return: row.estimated_return,
            status: parse_column("status", &row.status)?,
            approvals_total: row.approvals_total,
            approvals_approved: row.approvals_approved,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TaskRow {
    leave_permit_id: u64,
    approver_role: String,
    requester_id: u64,
    requester_name: String,
    leave_type: String,
    reason: String,
    start_time: DateTime<Utc>,
    estimated_return: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for ApprovalTask {
    type Error = PermitError;

    fn try_from(row: TaskRow) -> PermitResult<Self> {
        Ok(ApprovalTask {
            leave_permit_id: row.leave_permit_id,
            approver_role: parse_column("approver_role", &row.approver_role)?,
            requester_id: row.requester_id,
            requester_name: row.requester_name,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            reason: row.reason,
            start_time: row.start_time,
            estimated_return: row.estimated_return,
            created_at: row.created_at,
        })
    }
}

const SUMMARY_COLUMNS: &str = r#"
    p.id,
    p.requester_id,
    u.full_name AS requester_name,
    p.leave_type,
    p.reason,
    p.start_time,
    p.estimated_return,
    p.status,
    (SELECT COUNT(*) FROM leave_approvals a WHERE a.leave_permit_id = p.id) AS approvals_total,
    (SELECT COUNT(*) FROM leave_approvals a
        WHERE a.leave_permit_id = p.id AND a.status = 'APPROVED') AS approvals_approved,
    p.created_at
"#;

/// Column values that read back as `status`; completed permits may still be stored as `PRINTED`.
fn stored_statuses(status: PermitStatus) -> Vec<String> {
    match status {
        PermitStatus::Completed => vec!["COMPLETED".into(), "PRINTED".into()],
        other => vec![other.as_ref().to_string()],
    }
}

/// `%term%` for a case-insensitive `LIKE`, with the term's own wildcards escaped.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Loads a permit with its members and approvals over one connection.
///
/// With `for_update` the permit row stays locked until the surrounding transaction ends.
async fn load_aggregate(
    conn: &mut MySqlConnection,
    permit_id: u64,
    for_update: bool,
) -> PermitResult<Option<LeavePermitAggregate>> {
    let sql = format!(
        r#"
        SELECT
            id, requester_id, leave_type, reason, start_time, estimated_return,
            academic_year_id, class_id, related_schedule_id, status,
            verified_by_id, printed_by_id, completion_notes, created_at, updated_at
        FROM leave_permits
        WHERE id = ?{}
        "#,
        if for_update { " FOR UPDATE" } else { "" }
    );

    let Some(row) = sqlx::query_as::<_, PermitRow>(&sql)
        .bind(permit_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to fetch leave permit"))?
    else {
        return Ok(None);
    };

    let members = sqlx::query_scalar::<_, u64>(
        "SELECT user_id FROM leave_permit_members WHERE leave_permit_id = ? ORDER BY user_id",
    )
    .bind(permit_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("Failed to fetch group members"))?;

    let approvals = sqlx::query_as::<_, ApprovalRow>(
        r#"
        SELECT leave_permit_id, approver_user_id, approver_role, status, notes, decided_at
        FROM leave_approvals
        WHERE leave_permit_id = ?
        ORDER BY position
        "#,
    )
    .bind(permit_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("Failed to fetch approvals"))?
    .into_iter()
    .map(LeaveApproval::try_from)
    .collect::<PermitResult<Vec<_>>>()?;

    Ok(Some(LeavePermitAggregate {
        permit: row.into_permit(members)?,
        approvals,
    }))
}

#[derive(Clone)]
pub struct MySqlLeavePermitRepository {
    pool: MySqlPool,
}

impl MySqlLeavePermitRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeavePermitRepository for MySqlLeavePermitRepository {
    async fn create(
        &self,
        new: NewLeavePermit,
        approvers: &[Approver],
    ) -> PermitResult<LeavePermitAggregate> {
        if approvers.is_empty() {
            return Err(PermitError::Internal(
                "refusing to store a permit without approvers".into(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let status = PermitStatus::WaitingForPiket;
        let inserted = sqlx::query(
            r#"
            INSERT INTO leave_permits
                (requester_id, leave_type, reason, start_time, estimated_return,
                 academic_year_id, class_id, related_schedule_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.requester_id)
        .bind(new.leave_type.as_ref())
        .bind(&new.reason)
        .bind(new.start_time)
        .bind(new.estimated_return)
        .bind(new.academic_year_id)
        .bind(new.class_id)
        .bind(new.related_schedule_id)
        .bind(status.as_ref())
        .bind(new.created_at)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert leave permit"))?;

        let permit_id = inserted.last_insert_id();

        for member_id in &new.group_member_ids {
            sqlx::query("INSERT INTO leave_permit_members (leave_permit_id, user_id) VALUES (?, ?)")
                .bind(permit_id)
                .bind(*member_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to insert group member"))?;
        }

        let mut approvals = Vec::with_capacity(approvers.len());
        for (position, approver) in approvers.iter().enumerate() {
            let approval = LeaveApproval::pending(permit_id, approver.user_id, approver.role);

            sqlx::query(
                r#"
                INSERT INTO leave_approvals
                    (leave_permit_id, approver_user_id, position, approver_role, status)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(permit_id)
            .bind(approval.approver_user_id)
            .bind(position as u8)
            .bind(approval.approver_role.as_ref())
            .bind(approval.status.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert approval"))?;

            approvals.push(approval);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit leave permit"))?;

        Ok(LeavePermitAggregate {
            permit: LeavePermit {
                id: permit_id,
                requester_id: new.requester_id,
                leave_type: new.leave_type,
                reason: new.reason,
                start_time: new.start_time,
                estimated_return: new.estimated_return,
                group_member_ids: new.group_member_ids,
                academic_year_id: new.academic_year_id,
                class_id: new.class_id,
                related_schedule_id: new.related_schedule_id,
                status,
                verified_by_id: None,
                printed_by_id: None,
                completion_notes: None,
                created_at: new.created_at,
                updated_at: new.created_at,
            },
            approvals,
        })
    }

    async fn find(&self, permit_id: u64) -> PermitResult<Option<LeavePermitAggregate>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;

        load_aggregate(&mut conn, permit_id, false).await
    }

    async fn update_permit(
        &self,
        permit_id: u64,
        mutation: PermitMutation,
    ) -> PermitResult<LeavePermitAggregate> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut agg = load_aggregate(&mut tx, permit_id, true)
            .await?
            .ok_or(PermitError::PermitNotFound(permit_id))?;
        let before = agg.approvals.clone();

        // Dropping `tx` on error rolls back and releases the row lock.
        mutation(&mut agg)?;

        let p = &agg.permit;
        sqlx::query(
            r#"
            UPDATE leave_permits
            SET status = ?, verified_by_id = ?, printed_by_id = ?, completion_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(p.status.as_ref())
        .bind(p.verified_by_id)
        .bind(p.printed_by_id)
        .bind(&p.completion_notes)
        .bind(p.updated_at)
        .bind(permit_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to update leave permit"))?;

        for (old, new) in before.iter().zip(&agg.approvals) {
            if old == new {
                continue;
            }

            sqlx::query(
                r#"
                UPDATE leave_approvals
                SET status = ?, notes = ?, decided_at = ?
                WHERE leave_permit_id = ? AND approver_user_id = ?
                "#,
            )
            .bind(new.status.as_ref())
            .bind(&new.notes)
            .bind(new.decided_at)
            .bind(permit_id)
            .bind(new.approver_user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update approval"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit leave permit update"))?;

        Ok(agg)
    }

    async fn list(&self, query: &PermitListQuery) -> PermitResult<PermitListResponse> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            let stored = stored_statuses(status);
            where_sql.push_str(&format!(" AND p.status IN ({})", placeholders(stored.len())));
            args.extend(stored);
        }

        if let Some(search) = query.search.as_deref() {
            where_sql.push_str(" AND LOWER(u.full_name) LIKE ?");
            args.push(contains_pattern(search));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!(
            "SELECT COUNT(*) FROM leave_permits p JOIN users u ON u.id = p.requester_id{}",
            where_sql
        );

        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = count_q.bind(arg);
        }

        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count leave permits"))?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            r#"
            SELECT {}
            FROM leave_permits p
            JOIN users u ON u.id = p.requester_id
            {}
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
            SUMMARY_COLUMNS, where_sql
        );

        let mut data_q = sqlx::query_as::<_, SummaryRow>(&data_sql);
        for arg in &args {
            data_q = data_q.bind(arg);
        }

        let data = data_q
            .bind(u64::from(query.per_page))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch leave permit list"))?
            .into_iter()
            .map(PermitSummary::try_from)
            .collect::<PermitResult<Vec<_>>>()?;

        Ok(PermitListResponse {
            data,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn list_by_requester(&self, requester_id: u64) -> PermitResult<Vec<PermitSummary>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM leave_permits p
            JOIN users u ON u.id = p.requester_id
            WHERE p.requester_id = ?
            ORDER BY p.created_at DESC, p.id DESC
            "#,
            SUMMARY_COLUMNS
        );

        sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(requester_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch leave permit history"))?
            .into_iter()
            .map(PermitSummary::try_from)
            .collect()
    }

    async fn pending_for_approver(&self, approver_id: u64) -> PermitResult<Vec<ApprovalTask>> {
        sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT
                a.leave_permit_id,
                a.approver_role,
                p.requester_id,
                u.full_name AS requester_name,
                p.leave_type,
                p.reason,
                p.start_time,
                p.estimated_return,
                p.created_at
            FROM leave_approvals a
            JOIN leave_permits p ON p.id = a.leave_permit_id
            JOIN users u ON u.id = p.requester_id
            WHERE a.approver_user_id = ?
            AND a.status = 'PENDING'
            AND p.status = 'WAITING_FOR_APPROVAL'
            ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(approver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch pending approvals"))?
        .into_iter()
        .map(ApprovalTask::try_from)
        .collect()
    }
}
