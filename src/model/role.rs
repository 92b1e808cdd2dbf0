use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    /// Front-desk duty staff
    Piket,
    /// Head of student affairs (wakil kepala sekolah bidang kesiswaan)
    Waka,
}

/// What a caller is allowed to do in the leave-permit workflow.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    RequestLeave,
    VerifyLeave,
    DecideLeave,
    ReviewLeave,
}

impl Role {
    pub fn grants(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => matches!(capability, VerifyLeave | ReviewLeave),
            Role::Teacher => matches!(capability, DecideLeave),
            Role::Student => matches!(capability, RequestLeave),
            Role::Piket => matches!(capability, VerifyLeave | ReviewLeave),
            Role::Waka => matches!(capability, DecideLeave | ReviewLeave),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_parse_from_claim_strings() {
        assert_eq!(Role::from_str("WAKA").unwrap(), Role::Waka);
        assert_eq!(Role::Piket.as_ref(), "PIKET");
        assert!(Role::from_str("waka").is_err());
    }

    #[test]
    fn only_front_desk_roles_verify() {
        assert!(Role::Piket.grants(Capability::VerifyLeave));
        assert!(!Role::Teacher.grants(Capability::VerifyLeave));
        assert!(!Role::Student.grants(Capability::DecideLeave));
    }
}
