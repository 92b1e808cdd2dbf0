use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::error::PermitResult;
use crate::model::{
    academic::{AcademicYear, ClassMembership},
    role::Role,
    schedule::Schedule,
    user::UserProfile,
};
use crate::repository::{db_error, placeholders};
use crate::workflow::ports::AcademicDirectory;

/// Reads the academic tables maintained by the rest of the portal.
#[derive(Clone)]
pub struct MySqlAcademicDirectory {
    pool: MySqlPool,
}

impl MySqlAcademicDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AcademicDirectory for MySqlAcademicDirectory {
    async fn active_academic_year(&self) -> PermitResult<Option<AcademicYear>> {
        sqlx::query_as::<_, AcademicYear>(
            r#"
            SELECT id, name
            FROM academic_years
            WHERE is_active = TRUE
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch active academic year"))
    }

    async fn class_membership(
        &self,
        student_id: u64,
        academic_year_id: u64,
    ) -> PermitResult<Option<ClassMembership>> {
        sqlx::query_as::<_, ClassMembership>(
            r#"
            SELECT student_id, class_id, academic_year_id
            FROM class_members
            WHERE student_id = ? AND academic_year_id = ?
            "#,
        )
        .bind(student_id)
        .bind(academic_year_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch class membership"))
    }

    async fn classmates_among(
        &self,
        class_id: u64,
        academic_year_id: u64,
        candidate_ids: &[u64],
    ) -> PermitResult<Vec<u64>> {
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT student_id
            FROM class_members
            WHERE class_id = ? AND academic_year_id = ? AND student_id IN ({})
            "#,
            placeholders(candidate_ids.len())
        );

        let mut query = sqlx::query_scalar::<_, u64>(&sql)
            .bind(class_id)
            .bind(academic_year_id);
        for id in candidate_ids {
            query = query.bind(*id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to check classmates"))
    }

    async fn homeroom_teacher(
        &self,
        class_id: u64,
        academic_year_id: u64,
    ) -> PermitResult<Option<u64>> {
        let homeroom = sqlx::query_scalar::<_, Option<u64>>(
            r#"
            SELECT homeroom_teacher_id
            FROM classes
            WHERE id = ? AND academic_year_id = ?
            "#,
        )
        .bind(class_id)
        .bind(academic_year_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch homeroom teacher"))?;

        Ok(homeroom.flatten())
    }

    async fn schedules_on(
        &self,
        class_id: u64,
        academic_year_id: u64,
        day_of_week: u8,
    ) -> PermitResult<Vec<Schedule>> {
        sqlx::query_as::<_, Schedule>(
            r#"
            SELECT
                s.id,
                s.day_of_week,
                s.start_time,
                s.end_time,
                s.academic_year_id,
                s.teaching_assignment_id,
                ta.teacher_id,
                ta.class_id,
                ta.subject_id
            FROM schedules s
            JOIN teaching_assignments ta ON ta.id = s.teaching_assignment_id
            WHERE ta.class_id = ?
            AND s.academic_year_id = ?
            AND s.day_of_week = ?
            ORDER BY s.start_time, s.id
            "#,
        )
        .bind(class_id)
        .bind(academic_year_id)
        .bind(day_of_week)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch schedules"))
    }

    async fn users_with_role(&self, role: Role) -> PermitResult<Vec<u64>> {
        sqlx::query_scalar::<_, u64>(
            "SELECT user_id FROM user_roles WHERE role = ? ORDER BY user_id",
        )
        .bind(role.as_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch role holders"))
    }

    async fn user_profiles(&self, user_ids: &[u64]) -> PermitResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, full_name, nis FROM users WHERE id IN ({})",
            placeholders(user_ids.len())
        );

        let mut query = sqlx::query_as::<_, UserProfile>(&sql);
        for id in user_ids {
            query = query.bind(*id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch user profiles"))
    }
}
