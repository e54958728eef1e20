//! Property tests for the paginator window and query transitions.

use proptest::prelude::*;

use tabsync_core::{Navigation, PageItem, clamp_page, compute_window};
use tabsync_model::{QueryState, SortDirection, project_columns};

fn pages(items: &[PageItem]) -> Vec<u32> {
    items
        .iter()
        .filter_map(|item| match item {
            PageItem::Page(n) => Some(*n),
            PageItem::Ellipsis => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn window_has_both_ends_and_the_neighbourhood(
        last in 1u32..500,
        current in 0u32..600,
        radius in 0u32..6,
    ) {
        let items = compute_window(current, last, radius);
        let shown = pages(&items);
        let current = current.clamp(1, last);

        prop_assert_eq!(items.first(), Some(&PageItem::Page(1)));
        prop_assert_eq!(items.last(), Some(&PageItem::Page(last)));
        for page in current.saturating_sub(radius).max(1)..=current.saturating_add(radius).min(last) {
            prop_assert!(shown.contains(&page));
        }
        prop_assert!(shown.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn ellipsis_marks_exactly_the_gaps(
        last in 1u32..500,
        current in 1u32..500,
        radius in 0u32..6,
    ) {
        let items = compute_window(current, last, radius);
        for (index, item) in items.iter().enumerate() {
            if *item == PageItem::Ellipsis {
                prop_assert!(index > 0 && index + 1 < items.len());
                match (items[index - 1], items[index + 1]) {
                    (PageItem::Page(before), PageItem::Page(after)) => {
                        prop_assert!(after > before + 1);
                    }
                    _ => prop_assert!(false, "ellipsis next to an ellipsis"),
                }
            }
        }
        for pair in items.windows(2) {
            if let (PageItem::Page(a), PageItem::Page(b)) = (pair[0], pair[1]) {
                prop_assert_eq!(b, a + 1);
            }
        }
    }

    #[test]
    fn jumps_and_navigation_stay_in_range(last in 0u32..300, page in any::<u32>()) {
        let target = clamp_page(page, last);
        prop_assert!(target >= 1 && target <= last.max(1));

        let nav = Navigation::from_pages(page, last);
        for step in [nav.first, nav.prev, nav.next, nav.last_target].into_iter().flatten() {
            prop_assert!(step >= 1 && step <= nav.last);
            prop_assert_ne!(step, nav.current);
        }
    }

    #[test]
    fn search_and_page_size_changes_reset_the_page(
        page in 1u32..1000,
        text in ".{0,12}",
        per_page in 1u32..100,
    ) {
        let columns = project_columns();
        let state = QueryState::new(&columns, 10).unwrap().with_page(page);
        prop_assert_eq!(state.with_search(text).page(), 1);
        prop_assert_eq!(state.with_per_page(per_page).unwrap().page(), 1);
    }

    #[test]
    fn sorting_twice_flips_back(
        field in prop::sample::select(vec!["name", "status", "created_at", "due_date", "created_by"]),
        page in 1u32..50,
    ) {
        let columns = project_columns();
        let state = QueryState::new(&columns, 10).unwrap().with_page(page);
        let once = state.with_sort(&columns, field).unwrap();
        let twice = once.with_sort(&columns, field).unwrap();
        let thrice = twice.with_sort(&columns, field).unwrap();

        prop_assert_eq!(once.sort().unwrap().direction, SortDirection::Asc);
        prop_assert_eq!(twice.sort().unwrap().direction, SortDirection::Desc);
        prop_assert_eq!(thrice.sort(), once.sort());
        prop_assert_eq!(thrice.page(), page);
    }
}
