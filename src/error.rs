use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::{leave_approval::ApprovalStatus, leave_permit::PermitStatus};

pub type PermitResult<T> = Result<T, PermitError>;

#[derive(Debug, Display)]
pub enum PermitError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "No active academic year is configured")]
    NoActiveAcademicYear,

    #[display(fmt = "Requester is not enrolled in a class for the active academic year")]
    NoClassMembership,

    #[display(fmt = "Group members must be classmates of the requester: {:?}", _0)]
    InvalidGroupMembers(Vec<u64>),

    #[display(fmt = "Leave permits can only be requested on school days (Monday to Friday)")]
    HolidayError,

    #[display(
        fmt = "No lesson period at this time, it may be a free period or outside school hours"
    )]
    NoScheduleMatch,

    #[display(fmt = "Class {} has no homeroom teacher", _0)]
    NoHomeroomTeacher(u64),

    #[display(fmt = "No user holds the head of student affairs role")]
    NoAffairsHeadUser,

    #[display(fmt = "Cannot {} a permit that is {}", action, from)]
    InvalidStatusTransition {
        from: PermitStatus,
        action: &'static str,
    },

    #[display(fmt = "Caller is not an approver of this permit")]
    ApprovalNotFound,

    #[display(fmt = "Decision already recorded as {}", _0)]
    AlreadyDecided(ApprovalStatus),

    #[display(fmt = "Notes are required to {}", _0)]
    NotesRequired(&'static str),

    #[display(fmt = "Leave permit {} not found", _0)]
    PermitNotFound(u64),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for PermitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PermitError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for PermitError {
    fn from(e: sqlx::Error) -> Self {
        PermitError::Database(e)
    }
}

impl PermitError {
    /// Stable machine-readable identifier sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            PermitError::Validation(_) => "VALIDATION",
            PermitError::NoActiveAcademicYear => "NO_ACTIVE_ACADEMIC_YEAR",
            PermitError::NoClassMembership => "NO_CLASS_MEMBERSHIP",
            PermitError::InvalidGroupMembers(_) => "INVALID_GROUP_MEMBERS",
            PermitError::HolidayError => "HOLIDAY",
            PermitError::NoScheduleMatch => "NO_SCHEDULE_MATCH",
            PermitError::NoHomeroomTeacher(_) => "NO_HOMEROOM_TEACHER",
            PermitError::NoAffairsHeadUser => "NO_AFFAIRS_HEAD_USER",
            PermitError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            PermitError::ApprovalNotFound => "APPROVAL_NOT_FOUND",
            PermitError::AlreadyDecided(_) => "ALREADY_DECIDED",
            PermitError::NotesRequired(_) => "NOTES_REQUIRED",
            PermitError::PermitNotFound(_) => "PERMIT_NOT_FOUND",
            PermitError::Unauthorized(_) => "UNAUTHORIZED",
            PermitError::Forbidden(_) => "FORBIDDEN",
            PermitError::Database(_) | PermitError::Internal(_) => "INTERNAL",
        }
    }
}

impl ResponseError for PermitError {
    fn status_code(&self) -> StatusCode {
        match self {
            PermitError::Validation(_)
            | PermitError::NoActiveAcademicYear
            | PermitError::NoClassMembership
            | PermitError::InvalidGroupMembers(_)
            | PermitError::HolidayError
            | PermitError::NoScheduleMatch
            | PermitError::NotesRequired(_) => StatusCode::BAD_REQUEST,
            PermitError::NoHomeroomTeacher(_) | PermitError::NoAffairsHeadUser => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PermitError::InvalidStatusTransition { .. } | PermitError::AlreadyDecided(_) => {
                StatusCode::CONFLICT
            }
            PermitError::ApprovalNotFound | PermitError::Forbidden(_) => StatusCode::FORBIDDEN,
            PermitError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PermitError::PermitNotFound(_) => StatusCode::NOT_FOUND,
            PermitError::Database(_) | PermitError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Leave permit request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({
            "code": self.code(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_client_statuses() {
        let err = PermitError::InvalidStatusTransition {
            from: PermitStatus::WaitingForApproval,
            action: "print",
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Cannot print a permit that is WAITING_FOR_APPROVAL"
        );
        assert_eq!(
            PermitError::AlreadyDecided(ApprovalStatus::Rejected).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(PermitError::HolidayError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PermitError::ApprovalNotFound.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn server_errors_hide_details() {
        let err = PermitError::Internal("lock poisoned".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL");
    }
}
