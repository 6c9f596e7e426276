//! Persistent store: parameterized queries over the three portal tables.

pub mod attendance;
pub mod leave;
pub mod users;

use serde::Serialize;

/// Normalized pagination window for list pages.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(Some(3), None);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.offset(), 40);
    }
}
