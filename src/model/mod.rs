pub mod academic;
pub mod leave_approval;
pub mod leave_permit;
pub mod role;
pub mod schedule;
pub mod user;
