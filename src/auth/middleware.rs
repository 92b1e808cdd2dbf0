use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::PermitError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

fn reject(req: ServiceRequest, err: PermitError) -> Result<ServiceResponse<BoxBody>, Error> {
    Ok(req.into_response(err.error_response()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => {
                return reject(
                    req,
                    PermitError::Unauthorized("Invalid Authorization header encoding".into()),
                );
            }
        },
        None => {
            return reject(
                req,
                PermitError::Unauthorized("Missing Authorization header".into()),
            );
        }
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return reject(
            req,
            PermitError::Unauthorized("Authorization header must start with Bearer".into()),
        );
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return reject(
                req,
                PermitError::Unauthorized("Invalid or expired token".into()),
            );
        }
    };

    let auth_user = match AuthUser::try_from(claims) {
        Ok(user) => user,
        Err(e) => return reject(req, e),
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
