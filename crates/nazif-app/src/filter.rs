// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::ArchiveRecord;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Client-side narrowing of an archive listing. Empty fields are inactive;
/// active fields are ANDed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveFilter {
    /// Case-insensitive substring over client, place, unit type and count.
    pub text: String,
    /// Exact `YYYY-MM-DD` match.
    pub day: String,
    /// `YYYY-MM` prefix match.
    pub month: String,
}

impl ArchiveFilter {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.day.trim().is_empty()
            && self.month.trim().is_empty()
    }

    pub fn matches(&self, record: &ArchiveRecord) -> bool {
        let date = record.date.as_deref().unwrap_or("");

        let day = self.day.trim();
        if !day.is_empty() && date != day {
            return false;
        }

        let month = self.month.trim();
        if !month.is_empty() && date.get(..7) != Some(normalize_month(month).as_str()) {
            return false;
        }

        let needle = self.text.trim().to_lowercase();
        if !needle.is_empty() {
            let haystack = format!(
                "{} {} {} {}",
                record.client.as_deref().unwrap_or(""),
                record.place.as_deref().unwrap_or(""),
                record.unit_type.as_deref().unwrap_or(""),
                record.units_count,
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }

        true
    }
}

/// Pads a `YYYY-M` month to the `YYYY-MM` form dates carry; anything else
/// passes through unchanged.
fn normalize_month(month: &str) -> String {
    match month.split_once('-') {
        Some((year, m)) => match m.parse::<u8>() {
            Ok(number) => format!("{year}-{number:02}"),
            Err(_) => month.to_owned(),
        },
        None => month.to_owned(),
    }
}

pub fn filter_records<'a>(
    records: &'a [ArchiveRecord],
    filter: &ArchiveFilter,
) -> Vec<&'a ArchiveRecord> {
    records.iter().filter(|record| filter.matches(record)).collect()
}

/// Pagination over the filtered listing. Pages are 1-based; changing the
/// filter snaps back to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveView {
    filter: ArchiveFilter,
    page: usize,
    page_size: usize,
}

impl Default for ArchiveView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ArchiveView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: ArchiveFilter::default(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn filter(&self) -> &ArchiveFilter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filter(&mut self, filter: ArchiveFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn page_count(&self, filtered_len: usize) -> usize {
        filtered_len.div_ceil(self.page_size).max(1)
    }

    /// Applies the filter and slices out the current page. A page beyond the
    /// end comes back empty rather than wrapping.
    pub fn page_of<'a>(&self, records: &'a [ArchiveRecord]) -> Vec<&'a ArchiveRecord> {
        let filtered = filter_records(records, &self.filter);
        filtered
            .into_iter()
            .skip((self.page - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }
}
