use serde::{Deserialize, Serialize};

/// Access-token claims issued by the portal's identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Username
    pub sub: String,
    /// Role names such as `STUDENT` or `PIKET`; a user may hold several
    pub roles: Vec<String>,
    pub exp: usize,
}
