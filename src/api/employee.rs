use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::{AdminUser, Principal};
use crate::auth::password::CredentialHasher;
use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::User;
use crate::store::users::{ImageChange, NewUser, UserChanges};
use crate::store::{self, PageRequest};
use crate::utils::assets::AssetStore;
use crate::utils::multipart::{FormData, read_form};
use crate::view::{Page, Pagination, redirect};

const IMAGE_FIELD: &str = "profile_image";
const RECENT_ATTENDANCE: i64 = 30;

/// Fields of the add/edit employee form, sent as `multipart/form-data`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct EmployeeForm {
    #[schema(example = "alice")]
    pub username: String,
    /// Required on create; left blank on edit to keep the current one
    #[schema(example = "s3cret-pass")]
    pub password: Option<String>,
    #[schema(example = "Alice Anders")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    /// Edit only: `on` clears the current image
    pub remove_image: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub profile_image: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Matches username, name, email or department
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Submitted values echoed back when a form is redisplayed. The password is
/// never echoed.
#[derive(Serialize)]
struct FormValues<'a> {
    username: &'a str,
    name: &'a str,
    email: &'a str,
    department: &'a str,
}

impl<'a> From<&'a FormData> for FormValues<'a> {
    fn from(form: &'a FormData) -> Self {
        Self {
            username: form.text("username"),
            name: form.text("name"),
            email: form.text("email"),
            department: form.text("department"),
        }
    }
}

fn redisplay(
    template: &'static str,
    admin: &Principal,
    employee: Option<&User>,
    form: &FormData,
    error: &AppError,
) -> HttpResponse {
    use actix_web::ResponseError;

    Page::new(
        template,
        Some(admin),
        json!({ "employee": employee, "form": FormValues::from(form) }),
    )
    .error(error.to_string())
    .render(error.status_code())
}

/// Validates the submitted image, if any, without writing it.
fn check_upload(assets: &AssetStore, form: &mut FormData) -> Result<(), AppError> {
    if let Some(e) = form.upload_error.take() {
        return Err(e.into());
    }
    if let Some(upload) = &form.upload {
        assets.check(upload.bytes.len(), &upload.content_type)?;
    }
    Ok(())
}

/// Writes the submitted image, if any, returning its reference.
async fn store_upload(assets: &AssetStore, form: &mut FormData) -> Result<Option<String>, AppError> {
    match form.upload.take() {
        Some(upload) => Ok(Some(assets.store(upload.bytes, &upload.content_type).await?)),
        None => Ok(None),
    }
}

/// List employees
#[utoipa::path(
    get,
    path = "/admin/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employees, optionally filtered by a search term"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn list_employees(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    render_list(&admin, pool.get_ref(), &query, None, StatusCode::OK).await
}

async fn render_list(
    admin: &Principal,
    pool: &SqlitePool,
    query: &EmployeeQuery,
    error: Option<&str>,
    status: StatusCode,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::new(query.page, query.per_page);
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (employees, total) = store::users::list_employees(pool, search, page).await?;

    let mut view = Page::new(
        "employees/list",
        Some(admin),
        json!({
            "employees": employees,
            "search": search,
            "pagination": Pagination::new(page, total),
        }),
    );
    if let Some(error) = error {
        view = view.error(error);
    }
    Ok(view.render(status))
}

/// Add employee form
#[utoipa::path(
    get,
    path = "/admin/employees/new",
    responses(
        (status = 200, description = "Empty employee form"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn new_employee_form(AdminUser(admin): AdminUser) -> HttpResponse {
    Page::new("employees/new", Some(&admin), json!({ "employee": null, "form": null }))
        .render(StatusCode::OK)
}

/// Add employee
#[utoipa::path(
    post,
    path = "/admin/employees",
    request_body(content = EmployeeForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Employee created, redirected to the list"),
        (status = 400, description = "Missing field or unacceptable image; the form is redisplayed"),
        (status = 409, description = "Username already taken; the form is redisplayed"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
#[instrument(name = "create_employee", skip_all, fields(admin_id = admin.id))]
pub async fn create_employee(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    hasher: web::Data<CredentialHasher>,
    assets: web::Data<AssetStore>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(payload, IMAGE_FIELD, assets.max_bytes()).await?;

    let outcome = create_from_form(&pool, &hasher, &assets, &mut form).await;
    match outcome {
        Ok(id) => {
            info!(user_id = id, "Employee added");
            Ok(redirect("/admin/employees"))
        }
        Err(e @ (AppError::Validation(_) | AppError::Conflict(_))) => {
            Ok(redisplay("employees/new", &admin, None, &form, &e))
        }
        Err(e) => Err(e),
    }
}

async fn create_from_form(
    pool: &SqlitePool,
    hasher: &CredentialHasher,
    assets: &AssetStore,
    form: &mut FormData,
) -> Result<i64, AppError> {
    let username = form.text("username").to_string();
    let name = form.text("name").to_string();
    let password = form.raw("password").to_string();
    if username.is_empty() || name.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Username, password and name are required".to_string(),
        ));
    }
    check_upload(assets, form)?;
    if store::users::username_taken(pool, &username, None).await? {
        return Err(AppError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let password_hash = hasher.hash(&password)?;
    let image = store_upload(assets, form).await?;
    let email = form.optional("email").map(str::to_string);
    let department = form.optional("department").map(str::to_string);

    let created = store::users::create_user(
        pool,
        &NewUser {
            username: &username,
            password_hash: &password_hash,
            role: Role::User,
            name: &name,
            email: email.as_deref(),
            department: department.as_deref(),
            profile_image: image.as_deref(),
        },
    )
    .await;

    if created.is_err() {
        if let Some(reference) = image {
            assets.remove_in_background(reference);
        }
    }
    created
}

/// View employee
#[utoipa::path(
    get,
    path = "/admin/employees/{id}",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee record with recent attendance and leave"),
        (status = 404, description = "No such employee"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn show_employee(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee = store::users::find_employee(pool.get_ref(), path.into_inner()).await?;
    let attendance =
        store::attendance::list_for_user(pool.get_ref(), employee.id, RECENT_ATTENDANCE).await?;
    let leaves = store::leave::list_for_user(pool.get_ref(), employee.id).await?;

    Ok(Page::new(
        "employees/show",
        Some(&admin),
        json!({
            "employee": employee,
            "attendance": attendance,
            "leaves": leaves,
        }),
    )
    .render(StatusCode::OK))
}

/// Edit employee form
#[utoipa::path(
    get,
    path = "/admin/employees/{id}/edit",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee form filled with current values"),
        (status = 404, description = "No such employee"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn edit_employee_form(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee = store::users::find_employee(pool.get_ref(), path.into_inner()).await?;

    Ok(Page::new(
        "employees/edit",
        Some(&admin),
        json!({ "employee": employee, "form": null }),
    )
    .render(StatusCode::OK))
}

/// Edit employee
#[utoipa::path(
    post,
    path = "/admin/employees/{id}",
    params(("id" = i64, Path, description = "Employee id")),
    request_body(content = EmployeeForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Employee updated, redirected to the employee page"),
        (status = 400, description = "Missing field or unacceptable image; the form is redisplayed"),
        (status = 409, description = "Username already taken; the form is redisplayed"),
        (status = 404, description = "No such employee"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
#[instrument(name = "update_employee", skip_all, fields(admin_id = admin.id, user_id = *path))]
pub async fn update_employee(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    hasher: web::Data<CredentialHasher>,
    assets: web::Data<AssetStore>,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let employee = store::users::find_employee(pool.get_ref(), path.into_inner()).await?;
    let mut form = read_form(payload, IMAGE_FIELD, assets.max_bytes()).await?;

    match update_from_form(&pool, &hasher, &assets, &employee, &mut form).await {
        Ok(()) => Ok(redirect(&format!("/admin/employees/{}", employee.id))),
        Err(e @ (AppError::Validation(_) | AppError::Conflict(_))) => Ok(redisplay(
            "employees/edit",
            &admin,
            Some(&employee),
            &form,
            &e,
        )),
        Err(e) => Err(e),
    }
}

async fn update_from_form(
    pool: &SqlitePool,
    hasher: &CredentialHasher,
    assets: &AssetStore,
    employee: &User,
    form: &mut FormData,
) -> Result<(), AppError> {
    let username = form.text("username").to_string();
    let name = form.text("name").to_string();
    if username.is_empty() || name.is_empty() {
        return Err(AppError::Validation(
            "Username and name are required".to_string(),
        ));
    }
    check_upload(assets, form)?;
    if store::users::username_taken(pool, &username, Some(employee.id)).await? {
        return Err(AppError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let password_hash = match form.raw("password") {
        "" => None,
        password => Some(hasher.hash(password)?),
    };
    let image = match store_upload(assets, form).await? {
        Some(reference) => ImageChange::Set(reference),
        None if form.checked("remove_image") => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    let email = form.optional("email").map(str::to_string);
    let department = form.optional("department").map(str::to_string);

    let changes = UserChanges {
        username: Some(&username),
        name: &name,
        email: email.as_deref(),
        department: department.as_deref(),
        password_hash: password_hash.as_deref(),
        image,
    };

    if let Err(e) = store::users::update_employee(pool, employee.id, &changes).await {
        if let Some(reference) = changes.image.new_reference() {
            assets.remove_in_background(reference.to_string());
        }
        return Err(e);
    }

    if changes.image.is_change() {
        if let Some(old) = employee.profile_image.clone() {
            assets.remove_in_background(old);
        }
    }
    Ok(())
}

/// Delete employee
#[utoipa::path(
    post,
    path = "/admin/employees/{id}/delete",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 303, description = "Employee, attendance and leave removed; redirected to the list"),
        (status = 404, description = "No such employee"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn delete_employee(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    assets: web::Data<AssetStore>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let images = store::users::delete_employees(pool.get_ref(), &[id]).await?;
    for reference in images {
        assets.remove_in_background(reference);
    }

    info!(user_id = id, admin_id = admin.id, "Employee deleted");
    Ok(redirect("/admin/employees"))
}

/// Bulk delete employees
#[utoipa::path(
    post,
    path = "/admin/employees/bulk-delete",
    request_body(
        content = String,
        description = "Repeated `ids` fields, e.g. `ids=3&ids=7`",
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "All selected employees removed; redirected to the list"),
        (status = 400, description = "Nothing selected, or a malformed id"),
        (status = 404, description = "An id does not name an employee; nothing was deleted"),
        (status = 403, description = "Admins only")
    ),
    security(("session_cookie" = [])),
    tag = "Employees"
)]
pub async fn bulk_delete(
    AdminUser(admin): AdminUser,
    pool: web::Data<SqlitePool>,
    assets: web::Data<AssetStore>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let ids = form
        .iter()
        .filter(|(key, _)| key == "ids" || key == "ids[]")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::Validation(format!("Invalid employee id: {}", value)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        warn!(admin_id = admin.id, "Bulk delete with nothing selected");
        let query = EmployeeQuery {
            search: None,
            page: None,
            per_page: None,
        };
        return render_list(
            &admin,
            pool.get_ref(),
            &query,
            Some("Select at least one employee to delete"),
            StatusCode::BAD_REQUEST,
        )
        .await;
    }

    let images = store::users::delete_employees(pool.get_ref(), &ids).await?;
    for reference in images {
        assets.remove_in_background(reference);
    }

    info!(admin_id = admin.id, count = ids.len(), "Employees deleted in bulk");
    Ok(redirect("/admin/employees"))
}
