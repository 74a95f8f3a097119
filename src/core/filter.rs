//! Purpose: View parameters for the catalog list (filters and pagination).
//! Exports: `FilterState`, `FilterPatch`, `DateRange`, `SortBy`, `SortOrder`,
//!          `Pagination`, `PaginationPatch`.
//! Role: Plain values fed to the derivation engine; patches merge field-by-field.
//! Invariants: A date range is active only when both bounds are set.
//! Invariants: `Pagination` always holds `page >= 1` and `limit > 0`.
use crate::core::error::{Error, ErrorKind};
use time::OffsetDateTime;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortBy {
    Title,
    #[default]
    Date,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DateRange {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl DateRange {
    pub fn new(start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> Self {
        Self { start, end }
    }

    /// Both bounds, or `None` when either is missing (a lone bound is inert).
    pub fn bounds(&self) -> Option<(OffsetDateTime, OffsetDateTime)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.bounds().is_some()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub date_range: DateRange,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterPatch {
    pub search: Option<String>,
    pub date_range: Option<DateRange>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl FilterPatch {
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn date_range(range: DateRange) -> Self {
        Self {
            date_range: Some(range),
            ..Self::default()
        }
    }

    pub fn sort(sort_by: SortBy, sort_order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by),
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.date_range.is_none()
            && self.sort_by.is_none()
            && self.sort_order.is_none()
    }
}

impl FilterState {
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(search) = patch.search {
            self.search = search;
        }
        if let Some(range) = patch.date_range {
            self.date_range = range;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pagination {
    page: usize,
    limit: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PaginationPatch {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PaginationPatch {
    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            limit: None,
        }
    }

    pub fn limit(limit: usize) -> Self {
        Self {
            page: None,
            limit: Some(limit),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> Result<Self, Error> {
        if page == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("page must be at least 1")
                .with_hint("Pages are numbered from 1."));
        }
        if limit == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("limit must be greater than zero")
                .with_hint("Use a positive page size like 10."));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Index of the first record on this page; saturates instead of overflowing.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn patched(&self, patch: PaginationPatch) -> Result<Self, Error> {
        Self::new(
            patch.page.unwrap_or(self.page),
            patch.limit.unwrap_or(self.limit),
        )
    }

    pub fn first_page(&self) -> Self {
        Self {
            page: 1,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DateRange, FilterPatch, FilterState, Pagination, PaginationPatch, SortBy, SortOrder,
    };
    use crate::core::error::ErrorKind;
    use crate::core::record::parse_timestamp;

    #[test]
    fn defaults_sort_newest_first() {
        let filters = FilterState::default();
        assert_eq!(filters.search, "");
        assert_eq!(filters.sort_by, SortBy::Date);
        assert_eq!(filters.sort_order, SortOrder::Desc);
        assert!(!filters.date_range.is_active());
        assert_eq!(Pagination::default(), Pagination::new(1, 10).expect("pagination"));
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut filters = FilterState::default();
        filters.apply(FilterPatch::search("apple"));
        filters.apply(FilterPatch {
            sort_order: Some(SortOrder::Asc),
            ..FilterPatch::default()
        });
        assert_eq!(filters.search, "apple");
        assert_eq!(filters.sort_by, SortBy::Date);
        assert_eq!(filters.sort_order, SortOrder::Asc);
        assert!(FilterPatch::default().is_empty());
    }

    #[test]
    fn lone_bound_is_inert() {
        let start = parse_timestamp("2024-01-01");
        assert!(!DateRange::new(start, None).is_active());
        assert!(!DateRange::new(None, start).is_active());
        assert!(DateRange::new(start, start).is_active());
    }

    #[test]
    fn pagination_rejects_zero_page_and_limit() {
        assert_eq!(
            Pagination::new(0, 10).expect_err("page").kind(),
            ErrorKind::Usage
        );
        assert_eq!(
            Pagination::new(1, 0).expect_err("limit").kind(),
            ErrorKind::Usage
        );
    }

    #[test]
    fn pagination_patch_keeps_unspecified_fields() {
        let pagination = Pagination::new(2, 25).expect("pagination");
        let next = pagination.patched(PaginationPatch::page(3)).expect("patched");
        assert_eq!((next.page(), next.limit()), (3, 25));
        assert_eq!(next.offset(), 50);
        assert!(pagination.patched(PaginationPatch::limit(0)).is_err());
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let pagination = Pagination::new(usize::MAX, usize::MAX).expect("pagination");
        assert_eq!(pagination.offset(), usize::MAX);
    }
}
