use crate::{
    api::{attendance, dashboard, employee, leave_request, profile},
    auth::handlers,
    config::Config,
};
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{guard, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Only credential submission is throttled
    let per_minute = config.rate_login_per_min.max(1);
    let login_limit = GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / per_minute as u64).max(1))
        .burst_size(per_minute)
        .finish()
        .expect("login rate limit must be non-zero");

    // Public routes
    cfg.service(web::resource("/").route(web::get().to(dashboard::index)))
        .service(
            web::resource("/login")
                .guard(guard::Post())
                .wrap(Governor::new(&login_limit))
                .route(web::post().to(handlers::login)),
        )
        .service(web::resource("/login").route(web::get().to(handlers::login_page)))
        .service(web::resource("/logout").route(web::post().to(handlers::logout)));

    // Any logged-in user
    cfg.service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
        .service(
            web::resource("/profile")
                .route(web::get().to(profile::show_profile))
                .route(web::post().to(profile::update_profile)),
        );

    // Employees only
    cfg.service(
        web::resource("/attendance")
            .route(web::get().to(attendance::my_attendance))
            .route(web::post().to(attendance::mark_attendance)),
    )
    .service(
        web::resource("/leave")
            .route(web::get().to(leave_request::my_leaves))
            .route(web::post().to(leave_request::apply_leave)),
    );

    // Admins only
    cfg.service(
        web::scope("/admin")
            .service(web::resource("/attendance").route(web::get().to(attendance::attendance_report)))
            .service(web::resource("/leaves").route(web::get().to(leave_request::admin_leaves)))
            // /admin/leaves/{id}/decide
            .service(
                web::resource("/leaves/{id}/decide")
                    .route(web::post().to(leave_request::decide_leave)),
            )
            .service(
                web::scope("/employees")
                    // /admin/employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(web::resource("/new").route(web::get().to(employee::new_employee_form)))
                    .service(
                        web::resource("/bulk-delete").route(web::post().to(employee::bulk_delete)),
                    )
                    // /admin/employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::show_employee))
                            .route(web::post().to(employee::update_employee)),
                    )
                    .service(
                        web::resource("/{id}/edit").route(web::get().to(employee::edit_employee_form)),
                    )
                    .service(
                        web::resource("/{id}/delete").route(web::post().to(employee::delete_employee)),
                    ),
            ),
    );
}
