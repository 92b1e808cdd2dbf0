use std::str::FromStr;

use crate::error::PermitError;
use crate::model::role::{Capability, Role};
use crate::models::Claims;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub roles: Vec<Role>,
}

impl TryFrom<Claims> for AuthUser {
    type Error = PermitError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let roles = claims
            .roles
            .iter()
            .map(|r| Role::from_str(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| PermitError::Unauthorized("Invalid role".into()))?;

        if roles.is_empty() {
            return Err(PermitError::Unauthorized("Token carries no role".into()));
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            roles,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = PermitError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| PermitError::Unauthorized("Missing token".into())),
        )
    }
}

impl AuthUser {
    pub fn can(&self, capability: Capability) -> bool {
        self.roles.iter().any(|r| r.grants(capability))
    }

    pub fn require(&self, capability: Capability) -> Result<(), PermitError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(PermitError::Forbidden(match capability {
                Capability::RequestLeave => "Students only".into(),
                Capability::VerifyLeave => "Piket/Admin only".into(),
                Capability::DecideLeave => "Teachers/Waka only".into(),
                Capability::ReviewLeave => "Piket/Waka/Admin only".into(),
            }))
        }
    }
}
