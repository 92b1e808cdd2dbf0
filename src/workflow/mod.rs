//! Student leave-permit workflow: period lookup, approver selection, the approval
//! state machine and the front-desk finalization gate.

pub mod aggregate;
pub mod approver_resolver;
pub mod ports;
pub mod schedule_resolver;
pub mod service;
pub mod views;

pub use aggregate::LeavePermitAggregate;
pub use service::{CreatePermitInput, LeavePermitService, PermitFilter};
