//! Cursor-based pagination over GitLab GraphQL connections.
//!
//! A connection page carries its items plus a [`PageInfo`]. [`fetch_all`]
//! walks the cursor chain until the server reports no further pages and
//! returns every item exactly once, in first-seen order.

use std::collections::HashSet;
use std::future::Future;

use serde::Deserialize;

use super::error::GitLabError;

/// Upper bound on pages walked by [`fetch_all`].
pub const MAX_PAGES: usize = 1_000;

/// Position within a cursor-paginated connection.
///
/// # Example
///
/// ```
/// use mergelens::gitlab::pagination::PageInfo;
///
/// let info = PageInfo::new(true, Some("abc".to_owned()));
/// assert!(info.has_next_page());
/// assert_eq!(info.end_cursor(), Some("abc"));
/// assert!(PageInfo::last().is_exhausted());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

impl PageInfo {
    /// Creates page info from its two fields.
    #[must_use]
    pub const fn new(has_next_page: bool, end_cursor: Option<String>) -> Self {
        Self {
            has_next_page,
            end_cursor,
        }
    }

    /// Page info for the final page of a connection.
    #[must_use]
    pub const fn last() -> Self {
        Self::new(false, None)
    }

    /// Returns true if the server reports more pages.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Cursor to pass as `after` for the next page.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    /// Returns true when no further page can be requested.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        !self.has_next_page || self.end_cursor.is_none()
    }
}

/// One page of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Position of this page in the connection.
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }
}

/// Items with a stable identity used for de-duplication across pages.
pub trait Identified {
    /// Stable identifier, e.g. a commit SHA or a GraphQL global id.
    fn identity(&self) -> &str;
}

/// Walks every page of a connection and returns the de-duplicated items.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// end cursor afterwards.
///
/// # Errors
///
/// Any page failure aborts the walk; items gathered so far are discarded
/// and the error is returned unchanged.
pub async fn fetch_all<T, F, Fut>(fetch_page: F) -> Result<Vec<T>, GitLabError>
where
    T: Identified,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, GitLabError>>,
{
    fetch_all_with_limit(MAX_PAGES, fetch_page).await
}

/// [`fetch_all`] with an explicit page bound.
///
/// # Errors
///
/// See [`fetch_all`].
pub async fn fetch_all_with_limit<T, F, Fut>(
    max_pages: usize,
    mut fetch_page: F,
) -> Result<Vec<T>, GitLabError>
where
    T: Identified,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, GitLabError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages: usize = 0;

    loop {
        let Page {
            items: page_items,
            page_info,
        } = fetch_page(cursor.clone()).await?;
        pages = pages.saturating_add(1);
        items.extend(page_items);

        if !page_info.has_next_page {
            break;
        }
        let Some(next) = page_info.end_cursor else {
            tracing::warn!(pages, "page reported more results without a cursor; stopping");
            break;
        };
        if cursor.as_deref() == Some(next.as_str()) {
            tracing::warn!(pages, cursor = %next, "cursor did not advance; stopping");
            break;
        }
        if pages >= max_pages {
            tracing::warn!(pages, "page limit reached; stopping");
            break;
        }
        cursor = Some(next);
    }

    let fetched = items.len();
    let unique = dedupe_by_identity(items);
    tracing::debug!(pages, fetched, unique = unique.len(), "pagination complete");
    Ok(unique)
}

/// Removes repeated identities, keeping each item's first occurrence.
#[must_use]
pub fn dedupe_by_identity<T: Identified>(items: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.identity().to_owned()))
        .collect()
}
