use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::Local;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::leave_application::LeaveStatus;
use crate::store::{self, PageRequest};
use crate::view::{Page, redirect};

const PENDING_PREVIEW: u32 = 5;

/// Landing page: the dashboard for a session, the login form otherwise.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 303, description = "Redirected to /dashboard or /login")
    ),
    tag = "Dashboard"
)]
pub async fn index(user: Option<AuthUser>) -> HttpResponse {
    match user {
        Some(_) => redirect("/dashboard"),
        None => redirect("/login"),
    }
}

/// Dashboard
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Admins get head counts and the pending queue; employees get today's attendance and their leave"),
        (status = 303, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    AuthUser(user): AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let today = Local::now().date_naive();

    if user.role.is_admin() {
        let employees = store::users::count_employees(pool).await?;
        let present = store::attendance::count_present_on(pool, today).await?;
        let pending = store::leave::count_by_status(pool, LeaveStatus::Pending).await?;
        let (recent, _) = store::leave::list_all(
            pool,
            Some(LeaveStatus::Pending),
            PageRequest::new(None, Some(PENDING_PREVIEW)),
        )
        .await?;

        return Ok(Page::new(
            "dashboard/admin",
            Some(&user),
            json!({
                "today": today,
                "employee_count": employees,
                "present_today": present,
                "pending_leaves": pending,
                "recent_pending": recent,
            }),
        )
        .render(StatusCode::OK));
    }

    let attendance = store::attendance::find_for_user_on(pool, user.id, today).await?;
    let leaves = store::leave::list_for_user(pool, user.id).await?;

    Ok(Page::new(
        "dashboard/employee",
        Some(&user),
        json!({
            "today": today,
            "attendance_today": attendance,
            "leaves": leaves,
        }),
    )
    .render(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    use crate::test_support::{ADMIN_PASSWORD, TestContext, login, test_app};

    #[actix_web::test]
    async fn index_redirects_by_session() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/login");

        let cookie = login!(app, "admin", ADMIN_PASSWORD);
        let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get("location").unwrap(), "/dashboard");
    }

    #[actix_web::test]
    async fn anonymous_dashboard_goes_to_login() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get().uri("/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/login");
    }

    #[actix_web::test]
    async fn dashboard_depends_on_role() {
        let ctx = TestContext::new().await;
        ctx.employee("alice", "pw123456", "Alice A").await;
        let app = test_app!(ctx);

        let admin = login!(app, "admin", ADMIN_PASSWORD);
        let req = test::TestRequest::get().uri("/dashboard").cookie(admin).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["template"], "dashboard/admin");
        assert_eq!(body["employee_count"], 1);
        assert_eq!(body["user"]["role"], "admin");

        let alice = login!(app, "alice", "pw123456");
        let req = test::TestRequest::get().uri("/dashboard").cookie(alice).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["template"], "dashboard/employee");
        assert!(body["attendance_today"].is_null());
        assert_eq!(body["user"]["username"], "alice");
    }
}
