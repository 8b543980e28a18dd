use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested page. Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageOptions {
    pub fn new(page_number: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page_number: page_number.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page_number as i64 - 1) * self.page_size as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    pub current_page: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub total_pages: u32,
    pub total_count: u64,
}

impl Pagination {
    pub fn new(opts: PageOptions, total_count: u64) -> Self {
        let size = opts.page_size.max(1) as u64;
        // an empty listing still has one (empty) page
        let total_pages = total_count.div_ceil(size).max(1) as u32;
        let current_page = opts.page_number;
        Self {
            current_page,
            prev_page: (current_page > 1).then(|| current_page - 1),
            next_page: (current_page < total_pages).then(|| current_page + 1),
            total_pages,
            total_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, opts: PageOptions, total_count: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(opts, total_count),
        }
    }

    /// Paginate an already-materialized, already-ordered collection.
    pub fn from_items(all: Vec<T>, opts: PageOptions) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(opts.offset() as usize)
            .take(opts.page_size as usize)
            .collect();
        Self::new(items, opts, total)
    }
}
