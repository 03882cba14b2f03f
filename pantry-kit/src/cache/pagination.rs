//! Deterministic page slicing over result lists

use crate::error::{PantryError, Result};
use serde::{Deserialize, Serialize};

/// One page of a larger result list (pages are 1-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the items while keeping the page bookkeeping
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
        }
    }
}

/// Slice `items` into page `page` of size `page_size`
///
/// Returns `items[(page-1)*page_size .. min(page*page_size, len)]`, which is
/// empty for pages past the end.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Result<Page<T>> {
    if page == 0 {
        return Err(PantryError::Validation(
            "page numbers start at 1".to_string(),
        ));
    }
    if page_size == 0 {
        return Err(PantryError::Validation(
            "page size must be greater than 0".to_string(),
        ));
    }

    let total_items = items.len();
    let start = (page - 1).saturating_mul(page_size).min(total_items);
    let end = page.saturating_mul(page_size).min(total_items);

    Ok(Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_items,
        total_pages: total_items.div_ceil(page_size),
        has_next_page: page.saturating_mul(page_size) < total_items,
        has_previous_page: page > 1,
    })
}
