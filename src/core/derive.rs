//! Purpose: Derive the visible page from the full record set and view parameters.
//! Exports: `derive_page`, `Page`.
//! Role: Pure recompute step run after every store mutation or parameter change.
//! Invariants: No side effects; output depends only on `records`, `filters`, `pagination`.
//! Invariants: Order is filter(search) -> filter(date range) -> stable sort -> slice.
//! Invariants: Titles compare by Unicode collation (root locale), not code point.
//! Invariants: Out-of-range pages yield empty slices, never errors or panics.
use crate::core::filter::{FilterState, Pagination, SortBy, SortOrder};
use crate::core::record::Record;
use feruca::{Collator, Locale, Tailoring};
use std::cmp::Ordering;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// Records that survived filtering, before slicing.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn empty(pagination: Pagination) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: pagination.page(),
            limit: pagination.limit(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.limit.max(1))
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub fn derive_page(records: &[Record], filters: &FilterState, pagination: Pagination) -> Page {
    let needle = filters.search.to_lowercase();
    let bounds = filters.date_range.bounds();

    let matched: Vec<&Record> = records
        .iter()
        .filter(|record| matches_search(record, &needle))
        .filter(|record| match bounds {
            Some((start, end)) => record
                .timestamp()
                .is_some_and(|ts| start <= ts && ts <= end),
            None => true,
        })
        .collect();

    let sorted = match filters.sort_by {
        SortBy::Date => sort_keyed(
            matched
                .into_iter()
                .map(|record| (record.timestamp().map(|ts| ts.unix_timestamp_nanos()), record))
                .collect(),
            filters.sort_order,
            Ord::cmp,
        ),
        SortBy::Title => {
            let mut collator = title_collator();
            sort_keyed(
                matched
                    .into_iter()
                    .map(|record| (record.title.to_lowercase(), record))
                    .collect(),
                filters.sort_order,
                |a: &String, b: &String| collator.collate(a.as_str(), b.as_str()),
            )
        }
    };

    let total = sorted.len();
    let items = sorted
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.limit())
        .cloned()
        .collect();

    Page {
        items,
        total,
        page: pagination.page(),
        limit: pagination.limit(),
    }
}

fn matches_search(record: &Record, needle: &str) -> bool {
    needle.is_empty()
        || record.title.to_lowercase().contains(needle)
        || record.body.to_lowercase().contains(needle)
}

/// Root-locale collation with punctuation significant; titles arrive case-folded.
fn title_collator() -> Collator {
    Collator::new(Tailoring::Cldr(Locale::Root), false, false)
}

// `sort_by` is stable, so equal keys keep their incoming order in both directions.
fn sort_keyed<K, F>(
    mut keyed: Vec<(K, &Record)>,
    order: SortOrder,
    mut compare: F,
) -> Vec<&Record>
where
    F: FnMut(&K, &K) -> Ordering,
{
    keyed.sort_by(|(a, _), (b, _)| directed(compare(a, b), order));
    keyed.into_iter().map(|(_, record)| record).collect()
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
