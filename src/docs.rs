use crate::api::employee::EmployeeForm;
use crate::api::leave_request::{ApplyLeaveForm, DecideLeaveForm, LeaveFilter};
use crate::api::profile::ProfileForm;
use crate::auth::auth::Principal;
use crate::auth::session::SESSION_COOKIE;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::leave_application::{
    LeaveApplication, LeaveDecision, LeaveStatus, LeaveWithApplicant,
};
use crate::model::role::Role;
use crate::models::LoginForm;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Portal",
        version = "0.1.0",
        description = r#"
## HR Portal

A small internal portal for a team's day-to-day HR chores.

### Features
- **Attendance**: employees mark themselves present once per day; admins see a daily report
- **Leave**: employees apply for leave; admins approve or reject pending applications
- **Employees**: admins add, edit, search and delete employee records with a profile image
- **Profile**: everyone keeps their own name, contact details, password and image up to date

### Sessions
Log in through `POST /login`. The session lives in the `hr_session` cookie.

### Responses
Pages answer with a JSON view payload `{ template, user, error, message, ... }`.
Form submissions answer with a `303 See Other` redirect.
"#,
    ),
    paths(
        crate::auth::handlers::login_page,
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::dashboard::index,
        crate::api::dashboard::dashboard,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::my_attendance,
        crate::api::attendance::attendance_report,

        crate::api::leave_request::apply_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::admin_leaves,
        crate::api::leave_request::decide_leave,

        crate::api::employee::list_employees,
        crate::api::employee::new_employee_form,
        crate::api::employee::create_employee,
        crate::api::employee::show_employee,
        crate::api::employee::edit_employee_form,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::bulk_delete,

        crate::api::profile::show_profile,
        crate::api::profile::update_profile
    ),
    components(
        schemas(
            LoginForm,
            Principal,
            Role,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceEntry,
            LeaveStatus,
            LeaveDecision,
            LeaveApplication,
            LeaveWithApplicant,
            LeaveFilter,
            ApplyLeaveForm,
            DecideLeaveForm,
            EmployeeForm,
            ProfileForm
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "Auth", description = "Login and logout"),
        (name = "Dashboard", description = "Landing pages"),
        (name = "Attendance", description = "Daily attendance"),
        (name = "Leave", description = "Leave applications and decisions"),
        (name = "Employees", description = "Employee records (admin)"),
        (name = "Profile", description = "Self-service profile"),
    )
)]
pub struct ApiDoc;

/// Registers the `session_cookie` scheme referenced by protected paths.
struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}
