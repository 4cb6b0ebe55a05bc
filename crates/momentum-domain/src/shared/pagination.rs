use serde::{Deserialize, Serialize};

use super::DomainError;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::InvalidInput(
                "Page numbers start at 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidInput(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    /// Slice an already-materialized list
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = (self.offset() as usize).min(items.len());
        let end = (start + self.page_size as usize).min(items.len());
        Page {
            items: items[start..end].to_vec(),
            pagination: Pagination::new(*self, items.len() as u64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let size = request.page_size() as u64;
        let total_pages = total_items.div_ceil(size) as u32;
        Self {
            page: request.page(),
            page_size: request.page_size(),
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_page_and_oversized_page() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_slice_last_partial_page() {
        let items: Vec<u32> = (1..=7).collect();
        let page = PageRequest::new(3, 3).unwrap().slice(&items);
        assert_eq!(page.items, vec![7]);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.total_items, 7);
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let items = vec![1, 2];
        let page = PageRequest::new(5, 10).unwrap().slice(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_pages, 1);
    }
}
