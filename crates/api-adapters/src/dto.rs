//! Request and response bodies that are not plain domain types.

use domains::{IdeaListing, IdeaSummary, ReportReason};
use serde::{Deserialize, Serialize};
use services::{page_numbers, PageItem};

use crate::error::ErrorBody;

/// One listing page plus the page strip to render under it. On a failed
/// query `items` is empty and `error` says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingResponse {
    pub items: Vec<IdeaSummary>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub pages: Vec<PageItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ListingResponse {
    pub fn empty(page: u32, page_size: u32, error: ErrorBody) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page,
            page_size,
            total_pages: 0,
            pages: Vec::new(),
            error: Some(error),
        }
    }
}

impl From<IdeaListing> for ListingResponse {
    fn from(listing: IdeaListing) -> Self {
        let pages = page_numbers(listing.total_pages, listing.page);
        Self {
            items: listing.items,
            total_count: listing.total_count,
            page: listing.page,
            page_size: listing.page_size,
            total_pages: listing.total_pages,
            pages,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportPayload {
    pub reason: ReportReason,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
