use std::str::FromStr;

use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::{AdminUser, EmployeeUser};
use crate::error::AppError;
use crate::model::leave_application::{LeaveDecision, LeaveStatus};
use crate::store::{self, PageRequest, leave::NewLeave};
use crate::view::{Page, Pagination, redirect};

#[derive(Deserialize, ToSchema)]
pub struct ApplyLeaveForm {
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: Option<String>,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: Option<String>,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeaveForm {
    /// `approved` or `rejected`
    #[schema(example = "approved")]
    pub action: String,
    #[schema(example = "Enjoy")]
    pub comment: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// Filter by status (pending, approved, rejected)
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Items per page
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Submit a leave application
#[utoipa::path(
    post,
    path = "/leave",
    request_body(
        content = ApplyLeaveForm,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "Redirected to /leave; incomplete submissions create nothing"),
        (status = 403, description = "Admins do not apply for leave")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    EmployeeUser(user): EmployeeUser,
    pool: web::Data<SqlitePool>,
    form: web::Form<ApplyLeaveForm>,
) -> HttpResponse {
    let (Some(start), Some(end), Some(reason)) = (
        non_blank(&form.start_date),
        non_blank(&form.end_date),
        non_blank(&form.reason),
    ) else {
        info!(user_id = user.id, "Leave application missing fields, ignored");
        return redirect("/leave");
    };

    let (Some(start_date), Some(end_date)) = (parse_date(start), parse_date(end)) else {
        info!(user_id = user.id, start, end, "Leave application with unreadable dates, ignored");
        return redirect("/leave");
    };

    if start_date > end_date {
        info!(user_id = user.id, %start_date, %end_date, "Leave application ends before it starts, ignored");
        return redirect("/leave");
    }

    let leave = NewLeave {
        user_id: user.id,
        start_date,
        end_date,
        reason,
    };
    if let Err(e) = store::leave::create(pool.get_ref(), &leave).await {
        error!(user_id = user.id, error = %e, "Leave application could not be stored");
    }

    redirect("/leave")
}

/// Own leave applications
#[utoipa::path(
    get,
    path = "/leave",
    responses(
        (status = 200, description = "The caller's applications, newest first"),
        (status = 403, description = "Admins have no leave applications")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    EmployeeUser(user): EmployeeUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let leaves = store::leave::list_for_user(pool.get_ref(), user.id).await?;

    Ok(Page::new("leave/list", Some(&user), json!({ "leaves": leaves })).render(StatusCode::OK))
}

/// All leave applications
#[utoipa::path(
    get,
    path = "/admin/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave applications with applicant names"),
        (status = 400, description = "Unknown status filter"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn admin_leaves(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let status = match non_blank(&query.status) {
        Some(raw) => Some(
            LeaveStatus::from_str(raw)
                .map_err(|_| AppError::Validation(format!("Unknown leave status: {}", raw)))?,
        ),
        None => None,
    };
    let page = PageRequest::new(query.page, query.per_page);

    let (leaves, total) = store::leave::list_all(pool.get_ref(), status, page).await?;

    Ok(Page::new(
        "admin/leaves",
        Some(&admin),
        json!({
            "leaves": leaves,
            "status": status,
            "pagination": Pagination::new(page, total),
        }),
    )
    .render(StatusCode::OK))
}

/// Approve or reject a pending application
#[utoipa::path(
    post,
    path = "/admin/leaves/{id}/decide",
    params(
        ("id" = i64, Path, description = "Leave application id")
    ),
    request_body(
        content = DecideLeaveForm,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "Redirected to /admin/leaves whether or not anything changed"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn decide_leave(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    form: web::Form<DecideLeaveForm>,
) -> HttpResponse {
    let id = path.into_inner();

    let Ok(decision) = LeaveDecision::from_str(form.action.trim()) else {
        warn!(leave_id = id, action = %form.action, "Unknown leave decision, ignored");
        return redirect("/admin/leaves");
    };

    match store::leave::decide(pool.get_ref(), id, decision, non_blank(&form.comment)).await {
        Ok(true) => info!(leave_id = id, admin_id = admin.id, %decision, "Leave decided"),
        Ok(false) => warn!(leave_id = id, "Leave missing or no longer pending, decision ignored"),
        Err(e) => error!(leave_id = id, error = %e, "Leave decision could not be stored"),
    }

    redirect("/admin/leaves")
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use chrono::NaiveDate;
    use serde_json::Value;

    use crate::model::leave_application::LeaveStatus;
    use crate::store;
    use crate::store::leave::NewLeave;
    use crate::test_support::{ADMIN_PASSWORD, TestContext, login, test_app};

    #[actix_web::test]
    async fn apply_then_approve_with_comment() {
        let ctx = TestContext::new().await;
        let alice = ctx.employee("alice", "pw123456", "Alice A").await;
        let app = test_app!(ctx);

        let cookie = login!(app, "alice", "pw123456");
        let req = test::TestRequest::post()
            .uri("/leave")
            .cookie(cookie.clone())
            .set_form(vec![
                ("start_date", "2024-01-10"),
                ("end_date", "2024-01-12"),
                ("reason", "trip"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/leave");

        let leaves = store::leave::list_for_user(&ctx.pool, alice).await.unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].status, LeaveStatus::Pending);
        assert_eq!(leaves[0].reason, "trip");
        let id = leaves[0].id;

        let admin = login!(app, "admin", ADMIN_PASSWORD);
        let req = test::TestRequest::post()
            .uri(&format!("/admin/leaves/{}/decide", id))
            .cookie(admin)
            .set_form(vec![("action", "approved"), ("comment", "ok")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/admin/leaves");

        let leave = store::leave::find_by_id(&ctx.pool, id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.admin_comment.as_deref(), Some("ok"));
    }

    #[actix_web::test]
    async fn incomplete_application_creates_nothing() {
        let ctx = TestContext::new().await;
        let alice = ctx.employee("alice", "pw123456", "Alice A").await;
        let app = test_app!(ctx);
        let cookie = login!(app, "alice", "pw123456");

        for form in [
            vec![("start_date", "2024-01-10"), ("end_date", "2024-01-12"), ("reason", "  ")],
            vec![("start_date", "2024-01-10"), ("reason", "trip")],
            vec![("start_date", "10/01/2024"), ("end_date", "2024-01-12"), ("reason", "trip")],
            vec![("start_date", "2024-01-12"), ("end_date", "2024-01-10"), ("reason", "trip")],
        ] {
            let req = test::TestRequest::post()
                .uri("/leave")
                .cookie(cookie.clone())
                .set_form(form)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        }

        assert!(store::leave::list_for_user(&ctx.pool, alice).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn decided_application_is_final() {
        let ctx = TestContext::new().await;
        let alice = ctx.employee("alice", "pw123456", "Alice A").await;
        let id = store::leave::create(
            &ctx.pool,
            &NewLeave {
                user_id: alice,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
                reason: "trip",
            },
        )
        .await
        .unwrap();
        let app = test_app!(ctx);
        let admin = login!(app, "admin", ADMIN_PASSWORD);

        for (action, comment) in [("rejected", "no"), ("approved", "changed mind"), ("cancelled", "")] {
            let req = test::TestRequest::post()
                .uri(&format!("/admin/leaves/{}/decide", id))
                .cookie(admin.clone())
                .set_form(vec![("action", action), ("comment", comment)])
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
        }

        let leave = store::leave::find_by_id(&ctx.pool, id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::Rejected);
        assert_eq!(leave.admin_comment.as_deref(), Some("no"));

        let req = test::TestRequest::get()
            .uri("/admin/leaves?status=rejected")
            .cookie(admin.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["leaves"][0]["username"], "alice");

        let req = test::TestRequest::get()
            .uri("/admin/leaves?status=maybe")
            .cookie(admin)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn employees_cannot_decide() {
        let ctx = TestContext::new().await;
        ctx.employee("alice", "pw123456", "Alice A").await;
        let app = test_app!(ctx);
        let cookie = login!(app, "alice", "pw123456");

        let req = test::TestRequest::post()
            .uri("/admin/leaves/1/decide")
            .cookie(cookie)
            .set_form(vec![("action", "approved")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
