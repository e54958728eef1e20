//! Page-number window and navigation targets for the pagination bar.
//!
//! Everything here is a pure function of the authoritative page metadata.

use std::fmt;

use tabsync_model::PageMetadata;

/// One slot of the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("…"),
        }
    }
}

/// Page numbers to show around `current`.
///
/// Always includes page 1 and `last`, every page within `radius` of
/// `current`, and a single ellipsis for each run of omitted pages.
/// `current` is clamped into `1..=last`; a `last` of 0 counts as 1.
pub fn compute_window(current: u32, last: u32, radius: u32) -> Vec<PageItem> {
    let last = last.max(1);
    let current = current.clamp(1, last);
    let low = current.saturating_sub(radius).max(1);
    let high = current.saturating_add(radius).min(last);

    let mut items = Vec::with_capacity((high - low) as usize + 5);
    let mut previous = None;
    push_page(&mut items, &mut previous, 1);
    for page in low..=high {
        push_page(&mut items, &mut previous, page);
    }
    push_page(&mut items, &mut previous, last);
    items
}

fn push_page(items: &mut Vec<PageItem>, previous: &mut Option<u32>, page: u32) {
    if let Some(prev) = *previous {
        if page <= prev {
            return;
        }
        if page > prev + 1 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.push(PageItem::Page(page));
    *previous = Some(page);
}

/// Clamp a jump target into `1..=last`.
pub fn clamp_page(page: u32, last: u32) -> u32 {
    page.clamp(1, last.max(1))
}

/// First/previous/next/last targets.
///
/// A target is `None` when the current page already sits on that boundary,
/// so the corresponding control does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub current: u32,
    pub last: u32,
    pub first: Option<u32>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub last_target: Option<u32>,
}

impl Navigation {
    pub fn new(metadata: &PageMetadata) -> Self {
        Self::from_pages(metadata.current_page, metadata.last_page)
    }

    pub fn from_pages(current: u32, last: u32) -> Self {
        let last = last.max(1);
        let current = current.clamp(1, last);
        let at_start = current == 1;
        let at_end = current == last;
        Self {
            current,
            last,
            first: (!at_start).then_some(1),
            prev: (!at_start).then(|| current - 1),
            next: (!at_end).then(|| current + 1),
            last_target: (!at_end).then_some(last),
        }
    }

    /// Target of a free-form page jump.
    pub fn jump(&self, page: u32) -> u32 {
        clamp_page(page, self.last)
    }
}

/// Footer text: "Showing 11 - 20 of 42 results".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    pub from: u64,
    pub to: u64,
    pub total: u64,
    pub current: u32,
    pub last: u32,
}

impl PageSummary {
    pub fn new(metadata: &PageMetadata) -> Self {
        Self {
            from: metadata.first_item(),
            to: metadata.last_item(),
            total: metadata.total,
            current: metadata.current_page,
            last: metadata.last_page,
        }
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} - {} of {} results",
            self.from, self.to, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::PageItem::{Ellipsis, Page};

    #[test]
    fn middle_of_ten_pages() {
        assert_eq!(
            compute_window(5, 10, 2),
            vec![
                Page(1),
                Ellipsis,
                Page(3),
                Page(4),
                Page(5),
                Page(6),
                Page(7),
                Ellipsis,
                Page(10)
            ]
        );
    }

    #[test]
    fn edges_do_not_duplicate_boundaries() {
        assert_eq!(
            compute_window(1, 10, 2),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
        assert_eq!(
            compute_window(10, 10, 2),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]
        );
        assert_eq!(compute_window(1, 1, 2), vec![Page(1)]);
    }

    #[test]
    fn adjacent_runs_do_not_get_an_ellipsis() {
        assert_eq!(
            compute_window(4, 7, 2),
            (1..=7).map(Page).collect::<Vec<_>>()
        );
    }

    #[test]
    fn navigation_is_disabled_at_boundaries() {
        let first = Navigation::from_pages(1, 5);
        assert_eq!((first.first, first.prev), (None, None));
        assert_eq!((first.next, first.last_target), (Some(2), Some(5)));

        let last = Navigation::from_pages(5, 5);
        assert_eq!((last.next, last.last_target), (None, None));
        assert_eq!(last.prev, Some(4));

        let only = Navigation::from_pages(1, 1);
        assert_eq!(
            (only.first, only.prev, only.next, only.last_target),
            (None, None, None, None)
        );
    }

    #[test]
    fn jumps_are_clamped() {
        let nav = Navigation::from_pages(3, 8);
        assert_eq!(nav.jump(0), 1);
        assert_eq!(nav.jump(99), 8);
        assert_eq!(nav.jump(4), 4);
    }

    #[test]
    fn summary_reads_like_the_footer() {
        let summary = PageSummary::new(&PageMetadata::for_page(2, 10, 42));
        assert_eq!(summary.to_string(), "Showing 11 - 20 of 42 results");
        let empty = PageSummary::new(&PageMetadata::empty(10));
        assert_eq!(empty.to_string(), "Showing 0 - 0 of 0 results");
    }
}
