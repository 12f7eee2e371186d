//! Pagination utilities for the dashboard API

/// Rows per page for all paginated endpoints
pub const PAGE_SIZE: i64 = 50;

/// Window into a result set, computed from the total row count and the
/// requested page (1-indexed, clamped to valid bounds)
#[derive(Debug, Clone, Copy)]
pub struct PageWindow {
    pub page: i64,
    pub total_pages: i64,
    pub offset: i64,
}

pub fn page_window(total_results: i64, requested_page: i64) -> PageWindow {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    PageWindow {
        page,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let w = page_window(120, 2);
        assert_eq!(w.page, 2);
        assert_eq!(w.total_pages, 3);
        assert_eq!(w.offset, 50);
    }

    #[test]
    fn test_page_clamped_high() {
        let w = page_window(60, 99);
        assert_eq!(w.page, 2);
        assert_eq!(w.offset, 50);
    }

    #[test]
    fn test_page_clamped_low() {
        let w = page_window(60, 0);
        assert_eq!(w.page, 1);
        assert_eq!(w.offset, 0);
    }

    #[test]
    fn test_empty_results() {
        let w = page_window(0, 1);
        assert_eq!(w.page, 1);
        assert_eq!(w.total_pages, 0);
        assert_eq!(w.offset, 0);
    }

    #[test]
    fn test_exact_boundary() {
        let w = page_window(100, 2);
        assert_eq!(w.total_pages, 2);
        assert_eq!(w.offset, 50);
    }
}
