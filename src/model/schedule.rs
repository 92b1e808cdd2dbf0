use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A weekly lesson period. Owned by the scheduling module and only read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    #[schema(example = 311)]
    pub id: u64,
    /// ISO weekday, 1 = Monday .. 7 = Sunday
    #[schema(example = 2)]
    pub day_of_week: u8,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "09:45:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 7)]
    pub academic_year_id: u64,
    #[schema(example = 88)]
    pub teaching_assignment_id: u64,
    #[schema(example = 502)]
    pub teacher_id: u64,
    #[schema(example = 12)]
    pub class_id: u64,
    #[schema(example = 4)]
    pub subject_id: u64,
}
