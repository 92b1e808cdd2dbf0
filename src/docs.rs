use crate::api::leave_permit::{
    CreatePermitRequest, DecisionRequest, PermitListParams, PrintRequest,
};
use crate::model::{
    leave_approval::{ApprovalStatus, ApproverRole, Decision, LeaveApproval},
    leave_permit::{LeavePermit, LeaveType, PermitStatus},
    user::UserProfile,
};
use crate::workflow::LeavePermitAggregate;
use crate::workflow::views::{
    ApprovalTask, ApprovalView, PermitDetail, PermitListResponse, PermitSummary,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Permit API",
        version = "1.0.0",
        description = r#"
## School Leave-Permit Workflow

Students request permission to leave school during lesson hours. The front desk (**piket**)
verifies the request, the responsible teachers and the head of student affairs decide on it,
and the front desk prints the permit once everyone has approved.

### 🔹 Lifecycle
`WAITING_FOR_PIKET` → `WAITING_FOR_APPROVAL` → `APPROVED` / `REJECTED`, then `APPROVED` → `COMPLETED`.

- Approvers are resolved from the lesson running at the requested start time:
  homeroom teacher, subject teacher of that period, head of student affairs.
- One rejection rejects the permit; every approver must approve for it to be approved.
- Requests on Saturday or Sunday are refused.

### 🔐 Security
Every endpoint requires a **JWT Bearer** token whose `roles` claim lists the caller's roles.

### 📦 Response Format
- JSON responses; errors are `{"code": "...", "message": "..."}`
- Pagination supported for the permit list
"#,
    ),
    paths(
        crate::api::leave_permit::create_permit,
        crate::api::leave_permit::start_approval,
        crate::api::leave_permit::decide,
        crate::api::leave_permit::print_permit,
        crate::api::leave_permit::list_permits,
        crate::api::leave_permit::get_permit,
        crate::api::leave_permit::my_permits,
        crate::api::leave_permit::my_approvals
    ),
    components(
        schemas(
            CreatePermitRequest,
            DecisionRequest,
            PrintRequest,
            PermitListParams,
            LeaveType,
            PermitStatus,
            LeavePermit,
            ApproverRole,
            ApprovalStatus,
            Decision,
            LeaveApproval,
            LeavePermitAggregate,
            UserProfile,
            PermitSummary,
            PermitListResponse,
            ApprovalTask,
            ApprovalView,
            PermitDetail
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave Permit", description = "Leave permit request, approval and printing APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
