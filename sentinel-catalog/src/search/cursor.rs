//! Paginated search cursor.
//!
//! The cursor hides catalog pagination behind a forward-only sequence of
//! raw entries. Pages are fetched lazily: page 0 on first consumption, and
//! every following page when exactly one buffered entry remains, so the
//! next page is already buffered by the time the current one runs out.
//!
//! A cursor is single-use. Once exhausted or failed it stays that way, and
//! a fresh cursor must be built to run the query again.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::document::{Document, DocumentError};
use crate::error::{CatalogError, CatalogResult, FailureCause};
use crate::transport::CatalogTransport;

use super::filter::QueryFilterSet;

/// Path of the total result count in a search page.
pub const TOTAL_RESULTS_PATH: &str = "opensearch:totalResults";
/// Path of the result entries in a search page.
pub const ENTRY_PATH: &str = "entry";
/// Path of the next-page link in a search page.
pub const NEXT_LINK_PATH: &str = "link[@rel='next']";

/// Entries awaiting consumption plus pagination bookkeeping.
#[derive(Debug)]
struct PageBuffer {
    entries: VecDeque<Document>,
    next_link: Option<String>,
    /// Offset of the most recently fetched page.
    page_offset: usize,
    consumed: usize,
    total: usize,
}

#[derive(Debug)]
enum CursorState {
    Pending,
    Active(PageBuffer),
    Failed(CatalogError),
}

/// Lazy, forward-only sequence of raw catalog entries for one query.
///
/// Use [`SearchCursor::next_entry`] for explicit error handling, or iterate:
/// the iterator yields `Err` once on failure and then ends.
pub struct SearchCursor<T: CatalogTransport> {
    transport: T,
    query: String,
    page_size: usize,
    state: CursorState,
    error_reported: bool,
}

impl<T: CatalogTransport> SearchCursor<T> {
    /// Creates a cursor for the rendered `filters`.
    ///
    /// The query is rendered immediately so configuration errors surface
    /// here rather than on first consumption. No request is made until
    /// then.
    pub fn new(transport: T, filters: &QueryFilterSet, page_size: usize) -> CatalogResult<Self> {
        let query = filters.render()?;
        Ok(Self {
            transport,
            query,
            page_size: page_size.max(1),
            state: CursorState::Pending,
            error_reported: false,
        })
    }

    /// The rendered query this cursor runs.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total matching items, known after the first page arrives.
    pub fn total_items(&self) -> Option<usize> {
        match &self.state {
            CursorState::Active(buffer) => Some(buffer.total),
            _ => None,
        }
    }

    /// Number of entries handed out so far.
    pub fn consumed(&self) -> usize {
        match &self.state {
            CursorState::Active(buffer) => buffer.consumed,
            _ => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, CursorState::Failed(_))
    }

    /// Returns the next entry, `None` at the end of the results.
    ///
    /// After a failure every call returns the same error.
    pub fn next_entry(&mut self) -> CatalogResult<Option<Document>> {
        if let CursorState::Failed(err) = &self.state {
            return Err(err.clone());
        }

        if matches!(self.state, CursorState::Pending) {
            match self.first_page() {
                Ok(buffer) => self.state = CursorState::Active(buffer),
                Err(err) => return Err(self.fail(err)),
            }
        }

        let CursorState::Active(buffer) = &mut self.state else {
            return Ok(None);
        };

        if buffer.consumed == buffer.total {
            return Ok(None);
        }

        if buffer.entries.len() == 1 && buffer.consumed + 1 < buffer.total {
            if let Err(err) = Self::refresh(&self.transport, &self.query, self.page_size, buffer) {
                return Err(self.fail(err));
            }
        }

        match buffer.entries.pop_front() {
            Some(entry) => {
                buffer.consumed += 1;
                Ok(Some(entry))
            }
            None => {
                let cause = FailureCause::Protocol(format!(
                    "result pages ended after {} of {} entries",
                    buffer.consumed, buffer.total
                ));
                let err = CatalogError::search(&self.query, buffer.next_link.as_deref(), cause);
                Err(self.fail(err))
            }
        }
    }

    fn fail(&mut self, err: CatalogError) -> CatalogError {
        warn!(query = %self.query, error = %err, "Catalog search failed");
        self.state = CursorState::Failed(err.clone());
        err
    }

    fn first_page(&self) -> CatalogResult<PageBuffer> {
        info!(query = %self.query, page_size = self.page_size, "Starting catalog search");

        let wrap = |cause: FailureCause| CatalogError::search(&self.query, None, cause);

        let page = self
            .transport
            .search(&self.query, 0, self.page_size)
            .map_err(|e| wrap(e.into()))?;
        let total = page
            .value_as::<usize>(TOTAL_RESULTS_PATH)
            .and_then(|total| {
                total.ok_or_else(|| DocumentError::MissingElement {
                    path: TOTAL_RESULTS_PATH.to_string(),
                })
            })
            .map_err(|e| wrap(e.into()))?;

        let entries = page.all(ENTRY_PATH).map_err(|e| wrap(e.into()))?;
        let next_link = next_link(&page, 0, self.page_size, total).map_err(|e| wrap(e.into()))?;

        debug!(
            total,
            entries = entries.len(),
            has_next = next_link.is_some(),
            "Received first result page"
        );

        Ok(PageBuffer {
            entries: entries.into(),
            next_link,
            page_offset: 0,
            consumed: 0,
            total,
        })
    }

    fn refresh(
        transport: &T,
        query: &str,
        page_size: usize,
        buffer: &mut PageBuffer,
    ) -> CatalogResult<()> {
        let link = buffer.next_link.take().ok_or_else(|| {
            CatalogError::search(
                query,
                None,
                FailureCause::Protocol(format!(
                    "no next-page link after {} of {} entries",
                    buffer.consumed, buffer.total
                )),
            )
        })?;
        let wrap = |cause: FailureCause| CatalogError::search(query, Some(&link), cause);

        let page = transport.follow(&link).map_err(|e| wrap(e.into()))?;
        let entries = page.all(ENTRY_PATH).map_err(|e| wrap(e.into()))?;
        let page_offset = buffer.page_offset + page_size;
        let next = next_link(&page, page_offset, page_size, buffer.total)
            .map_err(|e| wrap(e.into()))?;

        debug!(
            offset = page_offset,
            entries = entries.len(),
            has_next = next.is_some(),
            "Received result page"
        );

        buffer.entries.extend(entries);
        buffer.page_offset = page_offset;
        buffer.next_link = next;
        Ok(())
    }
}

/// The page's next link, ignored once the page reaches the total.
fn next_link(
    page: &Document,
    offset: usize,
    page_size: usize,
    total: usize,
) -> Result<Option<String>, DocumentError> {
    if offset + page_size >= total {
        return Ok(None);
    }
    Ok(page.attribute(NEXT_LINK_PATH, "href")?.map(str::to_string))
}

impl<T: CatalogTransport> Iterator for SearchCursor<T> {
    type Item = CatalogResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error_reported {
            return None;
        }
        match self.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(err) => {
                self.error_reported = true;
                Some(Err(err))
            }
        }
    }
}
