//! Page-number pagination envelope

use serde::{Deserialize, Serialize};

/// One page of a paginated list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: u64,
    /// URL of the next page
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page
    #[serde(default)]
    pub previous: Option<String>,
    /// Items on this page
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

/// Endpoints that answer either with a bare array or with a page
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListOrPage<T> {
    /// Bare JSON array
    List(Vec<T>),
    /// Paginated envelope
    Page(Page<T>),
}

impl<T> ListOrPage<T> {
    /// Flatten into the items
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::List(items) => items,
            Self::Page(page) => page.results,
        }
    }
}

/// Number of pages needed to show `total` items, never less than one
pub const fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 || total == 0 {
        return 1;
    }
    total.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_is_ceiling() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(95, 10), 10);
        assert_eq!(page_count(7, 0), 1);
    }

    #[test]
    fn test_list_or_page() {
        let bare: ListOrPage<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(bare.into_items(), vec![1, 2]);

        let paged: ListOrPage<u32> =
            serde_json::from_str(r#"{"count": 3, "next": null, "previous": null, "results": [3]}"#)
                .unwrap();
        assert_eq!(paged.into_items(), vec![3]);
    }
}
