use crate::auth::auth::AuthUser;
use crate::model::{
    leave_approval::Decision,
    leave_permit::{LeaveType, PermitStatus},
    role::Capability,
};
#[allow(unused_imports)] // referenced from the OpenAPI annotations
use crate::workflow::{
    LeavePermitAggregate,
    views::{ApprovalTask, PermitDetail, PermitListResponse, PermitSummary},
};
use crate::workflow::{CreatePermitInput, LeavePermitService, PermitFilter};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreatePermitRequest {
    #[schema(example = "INDIVIDUAL")]
    pub leave_type: LeaveType,
    #[schema(example = "Berobat ke puskesmas")]
    pub reason: String,
    #[schema(example = "2026-01-06T02:10:00Z", format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2026-01-06T04:00:00Z", format = "date-time", value_type = String, nullable = true)]
    pub estimated_return: Option<DateTime<Utc>>,
    /// Classmates leaving together (GROUP only)
    #[serde(default)]
    #[schema(example = json!([]))]
    pub group_member_ids: Vec<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionRequest {
    #[schema(example = "APPROVED")]
    pub status: Decision,
    /// Required when rejecting
    #[schema(example = "Silakan, hati-hati di jalan")]
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PrintRequest {
    #[schema(example = "Dijemput orang tua")]
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PermitListParams {
    /// Filter by permit status
    pub status: Option<PermitStatus>,
    #[schema(example = "budi")]
    /// Case-insensitive part of the requester's name
    pub search: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Items per page, at most 100
    pub per_page: Option<u32>,
}

/* =========================
Create leave permit (Student)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-permits",
    request_body(
        content = CreatePermitRequest,
        description = "Leave permit payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave permit submitted", body = PermitDetail),
        (status = 400, description = "Invalid request, holiday, or no lesson at that time"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Approvers could not be resolved")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn create_permit(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    payload: web::Json<CreatePermitRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::RequestLeave)?;

    let payload = payload.into_inner();
    let created = service
        .create(
            auth.user_id,
            CreatePermitInput {
                leave_type: payload.leave_type,
                reason: payload.reason,
                start_time: payload.start_time,
                estimated_return: payload.estimated_return,
                group_member_ids: payload.group_member_ids,
            },
        )
        .await?;

    let detail = service.detail(created.id(), auth.user_id, true).await?;

    Ok(HttpResponse::Created().json(detail))
}

/* =========================
Verify and forward to approvers (Piket)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-permits/{permit_id}/start-approval",
    params(
        ("permit_id" = u64, Path, description = "ID of the leave permit to verify")
    ),
    responses(
        (status = 200, description = "Permit forwarded to approvers", body = LeavePermitAggregate),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave permit not found"),
        (status = 409, description = "Permit is not waiting for the front desk")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn start_approval(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::VerifyLeave)?;

    let updated = service
        .start_approval(path.into_inner(), auth.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/* =========================
Approve / reject (approver)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-permits/{permit_id}/approval",
    params(
        ("permit_id" = u64, Path, description = "ID of the leave permit to decide")
    ),
    request_body(
        content = DecisionRequest,
        description = "The caller's decision",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Decision recorded", body = LeavePermitAggregate),
        (status = 400, description = "Notes missing on rejection"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an approver of this permit"),
        (status = 404, description = "Leave permit not found"),
        (status = 409, description = "Already decided or permit not open for decisions")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn decide(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    path: web::Path<u64>,
    payload: web::Json<DecisionRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::DecideLeave)?;

    let DecisionRequest { status, notes } = payload.into_inner();
    let updated = service
        .decide(path.into_inner(), auth.user_id, status, notes)
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/* =========================
Print and close (Piket)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-permits/{permit_id}/print",
    params(
        ("permit_id" = u64, Path, description = "ID of the approved leave permit")
    ),
    request_body(
        content = PrintRequest,
        description = "Front-desk completion notes",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Permit printed and completed", body = LeavePermitAggregate),
        (status = 400, description = "Notes missing"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave permit not found"),
        (status = 409, description = "Permit is not approved")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn print_permit(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    path: web::Path<u64>,
    payload: web::Json<PrintRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::VerifyLeave)?;

    let updated = service
        .complete(path.into_inner(), auth.user_id, payload.into_inner().notes)
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// for getting leave permits endpoint
#[utoipa::path(
    get,
    path = "/api/leave-permits",
    params(PermitListParams),
    responses(
        (status = 200, description = "Paginated leave permit list", body = PermitListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn list_permits(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    query: web::Query<PermitListParams>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ReviewLeave)?;

    let query = query.into_inner();
    let response = service
        .list(PermitFilter {
            status: query.status,
            search: query.search,
            page: query.page,
            per_page: query.per_page,
        })
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// for getting a leave permit details endpoint
#[utoipa::path(
    get,
    path = "/api/leave-permits/{permit_id}",
    params(
        ("permit_id" = u64, Path, description = "ID of the leave permit to fetch")
    ),
    responses(
        (status = 200, description = "Leave permit found", body = PermitDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave permit not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn get_permit(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = service
        .detail(
            path.into_inner(),
            auth.user_id,
            auth.can(Capability::ReviewLeave),
        )
        .await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// The caller's own permits, newest first
#[utoipa::path(
    get,
    path = "/api/leave-permits/me",
    responses(
        (status = 200, description = "Caller's leave permit history", body = [PermitSummary]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn my_permits(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
) -> actix_web::Result<impl Responder> {
    let history = service.my_history(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// Permits waiting on the caller's decision, oldest first
#[utoipa::path(
    get,
    path = "/api/leave-permits/my-approvals",
    responses(
        (status = 200, description = "Caller's pending approvals", body = [ApprovalTask]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Permit"
)]
pub async fn my_approvals(
    auth: AuthUser,
    service: web::Data<LeavePermitService>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::DecideLeave)?;

    let tasks = service.my_approvals(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}
