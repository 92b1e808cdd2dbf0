pub mod leave_permit;
