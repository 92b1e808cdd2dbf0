use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AcademicYear {
    pub id: u64,
    pub name: String,
}

/// A student's seat in a class for one academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClassMembership {
    pub student_id: u64,
    pub class_id: u64,
    pub academic_year_id: u64,
}
