use serde::{Deserialize, Serialize};

/// Paginated response containing both items and page information
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

/// Page information returned with paginated results
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Current page number (1-based)
    pub page: u64,
    pub page_size: u64,
    /// Total number of items across all pages
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            (total_items + page_size - 1) / page_size
        };
        PaginatedResponse {
            items,
            page_info: PageInfo {
                page,
                page_size,
                total_items,
                total_pages,
            },
        }
    }
}
