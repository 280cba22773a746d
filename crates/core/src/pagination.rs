//! Relay-style connections and the visibility-aware keyset pager.
//!
//! Storage adapters return rows already ordered and already positioned past
//! the cursor. This module turns those rows into a [`Connection`], and
//! [`paginate_visible`] drives the fetch / filter / refetch loop for lists
//! whose rows are gated by the visibility policy.

use std::future::Future;

use uuid::Uuid;

use crate::cursor::CursorKey;
use crate::error::StorageResult;
use crate::metrics::record_visibility_refetch;

pub use crate::cursor::Cursor;

/// Paginated result set with edges and page info.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// List of edges (node + cursor pairs), in node order.
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
}

/// A single item in a paginated result.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The actual item.
    pub node: T,
    /// Cursor for this item (used for pagination).
    pub cursor: Cursor,
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether a valid `after` cursor positioned this page.
    pub has_previous_page: bool,
    /// Cursor of the first item in this page, absent when the page is empty.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in this page, absent when the page is empty.
    pub end_cursor: Option<Cursor>,
}

impl<T> Connection<T> {
    /// Build a connection from nodes already authorized and in final order.
    ///
    /// One edge is produced per node; the page size is not enforced here.
    pub fn build<K, F>(nodes: Vec<T>, has_next: bool, has_previous: bool, key_of: F) -> Self
    where
        K: CursorKey,
        F: Fn(&T) -> K,
    {
        let edges: Vec<Edge<T>> = nodes
            .into_iter()
            .map(|node| Edge {
                cursor: key_of(&node).encode(),
                node,
            })
            .collect();

        let page_info = PageInfo {
            has_next_page: has_next,
            has_previous_page: has_previous,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Self { edges, page_info }
    }

    /// Convert every node, keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|e| Edge {
                    node: f(e.node),
                    cursor: e.cursor,
                })
                .collect(),
            page_info: self.page_info,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Rows fetched with `limit + 1`, trimmed back to `limit`.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn from_overfetch(mut rows: Vec<T>, limit: usize) -> Self {
        let has_next = rows.len() > limit;
        rows.truncate(limit);
        Self { rows, has_next }
    }
}

/// Fetch one page of rows the requester may read.
///
/// `fetch(position, limit)` must return at most `limit` rows strictly past
/// `position` in the active order. Unreadable rows are dropped and do not
/// count toward `first`; while the page is short and storage returned a full
/// batch, fetching resumes from the last examined row.
///
/// `anchor_exists(id)` tells whether the row an `after` cursor was taken
/// from still belongs to the list. A previous page is only reported for a
/// cursor that matched such a row.
pub async fn paginate_visible<T, K, A, AFut, F, Fut, V, KF>(
    first: usize,
    after: Option<K>,
    anchor_exists: A,
    mut fetch: F,
    is_visible: V,
    key_of: KF,
) -> StorageResult<Connection<T>>
where
    K: CursorKey + Clone,
    A: FnOnce(Uuid) -> AFut,
    AFut: Future<Output = StorageResult<bool>>,
    F: FnMut(Option<K>, usize) -> Fut,
    Fut: Future<Output = StorageResult<Vec<T>>>,
    V: Fn(&T) -> bool,
    KF: Fn(&T) -> K,
{
    let has_previous = match &after {
        Some(key) => anchor_exists(key.row_id()).await?,
        None => false,
    };
    let want = first + 1;
    let mut visible = Vec::with_capacity(want);
    let mut position = after;
    let mut round = 0usize;

    loop {
        if round > 0 {
            record_visibility_refetch();
        }
        round += 1;

        let batch = fetch(position.clone(), want).await?;
        let exhausted = batch.len() < want;

        for row in batch {
            position = Some(key_of(&row));
            if is_visible(&row) {
                visible.push(row);
                if visible.len() == want {
                    break;
                }
            }
        }

        if visible.len() == want || exhausted {
            break;
        }
    }

    let page = Page::from_overfetch(visible, first);
    Ok(Connection::build(page.rows, page.has_next, has_previous, &key_of))
}
