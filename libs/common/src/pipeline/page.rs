//! Offset pagination over pipeline output

use serde::{Deserialize, Serialize};

/// Page size used when the caller gives none
pub const DEFAULT_LIMIT: u64 = 10;
/// Largest accepted page size
pub const MAX_LIMIT: u64 = 100;

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Normalize raw query values: page defaults to 1 and is at least 1,
    /// limit defaults to [`DEFAULT_LIMIT`] and is clamped to `1..=MAX_LIMIT`
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Documents to skip, saturating for pages past any real result set
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the paging metadata clients navigate with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T> Page<T> {
    /// Slice a full result set
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total_docs = all.len() as u64;
        let docs = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self::from_parts(docs, total_docs, request)
    }

    /// Build a page from an already-sliced result set
    pub fn from_parts(docs: Vec<T>, total_docs: u64, request: PageRequest) -> Self {
        let PageRequest { page, limit } = request;
        let total_pages = total_docs.div_ceil(limit).max(1);
        let has_prev_page = page > 1;
        let has_next_page = total_docs > page.saturating_mul(limit);

        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            paging_counter: request.offset().saturating_add(1),
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            paging_counter: self.paging_counter,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(
            PageRequest::new(Some(3), Some(1000)),
            PageRequest { page: 3, limit: 100 }
        );
    }

    #[test]
    fn test_has_next_page_iff_more_items_remain() {
        let items: Vec<u32> = (0..25).collect();

        let first = Page::from_all(items.clone(), PageRequest::new(Some(1), Some(10)));
        assert_eq!(first.docs.len(), 10);
        assert!(first.has_next_page);
        assert_eq!(first.next_page, Some(2));
        assert_eq!(first.prev_page, None);
        assert_eq!(first.total_pages, 3);

        let last = Page::from_all(items.clone(), PageRequest::new(Some(3), Some(10)));
        assert_eq!(last.docs, vec![20, 21, 22, 23, 24]);
        assert!(!last.has_next_page);
        assert_eq!(last.paging_counter, 21);

        let exact = Page::from_all((0..20).collect::<Vec<u32>>(), PageRequest::new(Some(2), Some(10)));
        assert!(!exact.has_next_page);
    }

    #[test]
    fn test_huge_page_number_is_past_the_end() {
        let request = PageRequest::new(Some(u64::MAX), Some(20));
        assert_eq!(request.offset(), u64::MAX);

        let page = Page::from_all((0..30).collect::<Vec<u32>>(), request);
        assert!(page.docs.is_empty());
        assert!(!page.has_next_page);
        assert_eq!(page.next_page, None);
        assert!(page.has_prev_page);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let page = Page::<u32>::from_all(Vec::new(), PageRequest::default());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
        assert!(page.docs.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = Page::from_all(vec![1u32], PageRequest::default());
        let value = serde_json::to_value(&page).expect("serialize");
        assert_eq!(value["totalDocs"], 1);
        assert_eq!(value["hasNextPage"], false);
        assert_eq!(value["pagingCounter"], 1);
    }
}
