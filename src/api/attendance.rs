use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::IntoParams;

use crate::auth::auth::{AdminUser, EmployeeUser};
use crate::error::AppError;
use crate::store;
use crate::view::{Page, redirect};

const HISTORY_LIMIT: i64 = 60;

/// Mark today's attendance
#[utoipa::path(
    post,
    path = "/attendance",
    responses(
        (status = 303, description = "Attendance recorded (or the failure logged); redirected to /attendance"),
        (status = 403, description = "Admins do not mark attendance")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    EmployeeUser(user): EmployeeUser,
    pool: web::Data<SqlitePool>,
) -> HttpResponse {
    let today = Local::now().date_naive();

    match store::attendance::mark_present(pool.get_ref(), user.id, today).await {
        Ok(()) => info!(user_id = user.id, %today, "Attendance marked"),
        Err(e) => error!(user_id = user.id, error = %e, "Attendance could not be marked"),
    }

    redirect("/attendance")
}

/// Own attendance history
#[utoipa::path(
    get,
    path = "/attendance",
    responses(
        (status = 200, description = "Recent attendance records, newest first"),
        (status = 403, description = "Admins have no attendance")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    EmployeeUser(user): EmployeeUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let today = Local::now().date_naive();
    let records = store::attendance::list_for_user(pool.get_ref(), user.id, HISTORY_LIMIT).await?;
    let marked_today = records.iter().any(|r| r.date == today);

    Ok(Page::new(
        "attendance/history",
        Some(&user),
        json!({
            "records": records,
            "today": today,
            "marked_today": marked_today,
        }),
    )
    .render(StatusCode::OK))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Day to report on (YYYY-MM-DD), defaults to today
    pub date: Option<String>,
}

/// Daily attendance report
#[utoipa::path(
    get,
    path = "/admin/attendance",
    params(ReportQuery),
    responses(
        (status = 200, description = "Attendance for the requested day"),
        (status = 400, description = "Malformed date"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn attendance_report(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date: {}", raw)))?,
        None => Local::now().date_naive(),
    };

    let entries = store::attendance::list_for_date(pool.get_ref(), date).await?;
    let employees = store::users::count_employees(pool.get_ref()).await?;

    Ok(Page::new(
        "attendance/report",
        Some(&admin),
        json!({
            "date": date,
            "entries": entries,
            "employee_count": employees,
        }),
    )
    .render(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use chrono::Local;
    use serde_json::Value;

    use crate::model::attendance::AttendanceStatus;
    use crate::store;
    use crate::test_support::{ADMIN_PASSWORD, TestContext, login, test_app};

    #[actix_web::test]
    async fn marking_twice_in_one_day_keeps_one_record() {
        let ctx = TestContext::new().await;
        let alice = ctx.employee("alice", "pw123456", "Alice A").await;
        let app = test_app!(ctx);
        let cookie = login!(app, "alice", "pw123456");

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/attendance")
                .cookie(cookie.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(resp.headers().get("location").unwrap(), "/attendance");
        }

        let records = store::attendance::list_for_user(&ctx.pool, alice, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, Local::now().date_naive());
        assert_eq!(records[0].status, AttendanceStatus::Present);

        let req = test::TestRequest::get()
            .uri("/attendance")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["marked_today"], true);
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn admins_cannot_mark_attendance() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);
        let cookie = login!(app, "admin", ADMIN_PASSWORD);

        let req = test::TestRequest::post()
            .uri("/attendance")
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn report_lists_the_requested_day() {
        let ctx = TestContext::new().await;
        let alice = ctx.employee("alice", "pw123456", "Alice A").await;
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        store::attendance::mark_present(&ctx.pool, alice, day).await.unwrap();
        let app = test_app!(ctx);
        let cookie = login!(app, "admin", ADMIN_PASSWORD);

        let req = test::TestRequest::get()
            .uri("/admin/attendance?date=2024-01-10")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["template"], "attendance/report");
        assert_eq!(body["entries"][0]["username"], "alice");

        let req = test::TestRequest::get()
            .uri("/admin/attendance?date=yesterday")
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
