use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A validated, clamped page window. Construction is the only way to get
/// one, so every `PageRequest` in the system already satisfies
/// `page_number >= 1` and `1 <= page_size <= max_page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// Oversized page sizes are truncated rather than rejected, to keep a
    /// single request from scanning the whole table.
    pub fn new(page_number: u32, page_size: u32, max_page_size: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_number - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the page-independent total for the same filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: &PageRequest) -> Self {
        Self {
            items,
            total_count,
            page_number: page.page_number(),
            page_size: page.page_size(),
        }
    }
}

/// What `get_all` hands back: the full sequence when no page was requested,
/// one window plus metadata otherwise. Serializes as a bare array or as the
/// paged envelope respectively.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Full(Vec<T>),
    Page(PagedResult<T>),
}

/// Query parameters accepted by the list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    /// Comma-separated relation names to eager-load, e.g. `Country`.
    pub include: Option<String>,
}

impl ListQuery {
    /// `None` when the client asked for no paging at all.
    pub fn page(&self, max_page_size: u32) -> Option<PageRequest> {
        if self.page_number.is_none() && self.page_size.is_none() {
            return None;
        }
        Some(self.page_or_default(max_page_size))
    }

    pub fn page_or_default(&self, max_page_size: u32) -> PageRequest {
        PageRequest::new(
            self.page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_page_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 10, 50, 1, 10)]
    #[case(0, 10, 50, 1, 10)]
    #[case(3, 0, 50, 3, 1)]
    #[case(2, 500, 50, 2, 50)]
    #[case(1, 50, 50, 1, 50)]
    fn page_request_clamps(
        #[case] number: u32,
        #[case] size: u32,
        #[case] max: u32,
        #[case] expected_number: u32,
        #[case] expected_size: u32,
    ) {
        let page = PageRequest::new(number, size, max);
        assert_eq!(page.page_number(), expected_number);
        assert_eq!(page.page_size(), expected_size);
    }

    #[rstest]
    #[case(1, 10, 0)]
    #[case(3, 10, 20)]
    #[case(2, 50, 50)]
    fn offset_is_zero_based(#[case] number: u32, #[case] size: u32, #[case] expected: i64) {
        let page = PageRequest::new(number, size, 50);
        assert_eq!(page.offset(), expected);
        assert_eq!(page.limit(), i64::from(size));
    }

    #[test]
    fn list_query_without_params_means_no_paging() {
        let query = ListQuery::default();
        assert_eq!(query.page(50), None);
        let page = query.page_or_default(50);
        assert_eq!(page.page_number(), DEFAULT_PAGE_NUMBER);
        assert_eq!(page.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn list_query_with_either_param_pages() {
        let query = ListQuery {
            page_size: Some(5),
            ..ListQuery::default()
        };
        let page = query.page(50).unwrap();
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.page_size(), 5);
    }

    #[test]
    fn listing_serializes_full_as_bare_array() {
        let listing = Listing::Full(vec![1, 2, 3]);
        assert_eq!(serde_json::to_value(&listing).unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn paged_result_serializes_camel_case() {
        let page = PageRequest::new(2, 2, 50);
        let listing = Listing::Page(PagedResult::new(vec![1, 2], 7, &page));
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["totalCount"], 7);
        assert_eq!(value["pageNumber"], 2);
        assert_eq!(value["items"], serde_json::json!([1, 2]));
    }
}
