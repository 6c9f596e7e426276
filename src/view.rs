use actix_web::{HttpResponse, http::StatusCode, http::header};
use serde::Serialize;

use crate::auth::auth::Principal;
use crate::store::PageRequest;

/// Payload handed to the view renderer: the template to use, who is looking
/// at it, an optional inline error or notice, and the page data flattened in.
#[derive(Serialize)]
pub struct Page<'a, T: Serialize> {
    pub template: &'static str,
    pub user: Option<&'a Principal>,
    pub error: Option<String>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<'a, T: Serialize> Page<'a, T> {
    pub fn new(template: &'static str, user: Option<&'a Principal>, data: T) -> Self {
        Self {
            template,
            user,
            error: None,
            message: None,
            data,
        }
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn render(&self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}

/// 303 so a form POST is followed by a GET.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

/// Position within a paginated list, as shown under the table.
#[derive(Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }
}
