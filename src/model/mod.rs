pub mod attendance;
pub mod leave_application;
pub mod role;
pub mod user;
