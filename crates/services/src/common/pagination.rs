//! Page arithmetic and the page-number strip shown under a listing.

use serde::Serialize;

/// Above this many pages the strip collapses into first/window/last.
pub const MAX_PAGES_SHOWN: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageItem {
    Page { number: u32 },
    Ellipsis,
}

impl PageItem {
    pub fn page(number: u32) -> Self {
        Self::Page { number }
    }
}

pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Page numbers to render for `current_page` out of `total_pages`.
///
/// Up to five pages are listed in full. Beyond that the first and last page
/// are always present, a three-page window sits around the current page
/// (pinned to 2..=3 or to the last three before the end near the edges), and
/// an ellipsis fills each gap.
pub fn page_numbers(total_pages: u32, current_page: u32) -> Vec<PageItem> {
    if total_pages <= MAX_PAGES_SHOWN {
        return (1..=total_pages).map(PageItem::page).collect();
    }

    let current = current_page.clamp(1, total_pages);
    let mut start = current.saturating_sub(1).max(2);
    let mut end = (current + 1).min(total_pages - 1);
    if current <= 2 {
        end = 3;
    } else if current >= total_pages - 1 {
        start = total_pages - 2;
    }

    let mut items = Vec::with_capacity(7);
    items.push(PageItem::page(1));
    if start > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((start..=end).map(PageItem::page));
    if end < total_pages - 1 {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::page(total_pages));
    items
}
