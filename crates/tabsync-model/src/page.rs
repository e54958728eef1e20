#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, PaginationError};
use crate::record::Record;

/// Authoritative pagination facts for the page last delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageMetadata {
    /// Metadata for an empty collection.
    pub fn empty(per_page: u32) -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            per_page,
            total: 0,
        }
    }

    /// Metadata a paginator would report for `page` of `total` records.
    ///
    /// `last_page` never drops below 1, even for an empty collection.
    pub fn for_page(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(u64::from(per_page)).max(1);
        Self {
            current_page: page.max(1),
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            per_page,
            total,
        }
    }

    /// 1-based index of the first record on this page, 0 when empty.
    pub fn first_item(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (u64::from(self.per_page) * u64::from(self.current_page.saturating_sub(1)) + 1).min(self.total)
    }

    /// 1-based index of the last record on this page, 0 when empty.
    pub fn last_item(&self) -> u64 {
        (u64::from(self.per_page) * u64::from(self.current_page)).min(self.total)
    }
}

/// One page as returned by the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    #[serde(alias = "data")]
    pub records: Vec<Record>,
    pub pagination: PageMetadata,
}

/// A response whose pagination passed (or was clamped into) its invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledPage {
    pub records: Vec<Record>,
    pub metadata: PageMetadata,
    pub violations: Vec<InvariantViolation>,
}

impl PageResponse {
    /// Check the pagination invariants, clamping what can be clamped.
    ///
    /// Fails with [`PaginationError`] when the metadata is unusable.
    pub fn reconcile(self) -> Result<ReconciledPage, PaginationError> {
        let mut metadata = self.pagination;
        let mut violations = Vec::new();
        if metadata.per_page == 0 {
            return Err(PaginationError::ZeroPerPage);
        }
        if metadata.last_page == 0 {
            violations.push(InvariantViolation::LastPageZero);
            metadata.last_page = 1;
        }
        if metadata.current_page == 0 || metadata.current_page > metadata.last_page {
            violations.push(InvariantViolation::PageOutOfRange {
                reported: metadata.current_page,
                last_page: metadata.last_page,
            });
            metadata.current_page = metadata.current_page.clamp(1, metadata.last_page);
        }
        if metadata.total > 0
            && u64::from(metadata.per_page) * u64::from(metadata.current_page - 1) >= metadata.total
        {
            violations.push(InvariantViolation::PageBeyondTotal {
                page: metadata.current_page,
                total: metadata.total,
            });
        }
        if self.records.len() > metadata.per_page as usize {
            violations.push(InvariantViolation::OversizedPage {
                records: self.records.len(),
                per_page: metadata.per_page,
            });
        }
        Ok(ReconciledPage {
            records: self.records,
            metadata,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(current_page: u32, last_page: u32, per_page: u32, total: u64) -> PageResponse {
        PageResponse {
            records: Vec::new(),
            pagination: PageMetadata {
                current_page,
                last_page,
                per_page,
                total,
            },
        }
    }

    #[test]
    fn consistent_metadata_passes_untouched() {
        let page = response(2, 3, 10, 25).reconcile().unwrap();
        assert!(page.violations.is_empty());
        assert_eq!(page.metadata.current_page, 2);
    }

    #[test]
    fn out_of_range_page_is_clamped_and_reported() {
        let page = response(12, 10, 10, 95).reconcile().unwrap();
        assert_eq!(page.metadata.current_page, 10);
        assert_eq!(
            page.violations,
            vec![InvariantViolation::PageOutOfRange {
                reported: 12,
                last_page: 10
            }]
        );
    }

    #[test]
    fn zero_last_page_is_lifted_to_one() {
        let page = response(1, 0, 10, 0).reconcile().unwrap();
        assert_eq!(page.metadata.last_page, 1);
        assert_eq!(page.violations, vec![InvariantViolation::LastPageZero]);
    }

    #[test]
    fn zero_per_page_is_malformed() {
        assert_eq!(
            response(1, 1, 0, 0).reconcile(),
            Err(PaginationError::ZeroPerPage)
        );
    }

    #[test]
    fn item_range_matches_footer() {
        let meta = PageMetadata::for_page(3, 10, 25);
        assert_eq!(meta.last_page, 3);
        assert_eq!((meta.first_item(), meta.last_item()), (21, 25));
        let empty = PageMetadata::empty(10);
        assert_eq!((empty.first_item(), empty.last_item()), (0, 0));
    }

    #[test]
    fn data_is_accepted_for_records() {
        let page: PageResponse = serde_json::from_str(
            r#"{"data": [{"id": 1, "name": "A"}],
                "pagination": {"current_page": 1, "last_page": 1, "per_page": 10, "total": 1}}"#,
        )
        .unwrap();
        assert_eq!(page.records.len(), 1);
    }
}
