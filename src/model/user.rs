use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserProfile {
    #[schema(example = 1043)]
    pub id: u64,
    #[schema(example = "Siti Rahmawati")]
    pub full_name: String,
    /// Student number, absent for staff
    #[schema(example = "2324101", nullable = true)]
    pub nis: Option<String>,
}
