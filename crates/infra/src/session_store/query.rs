//! History query interface for session reporting.
//!
//! All queries are paginated by default and ordered newest `opened_at`
//! first. Closed sessions are returned with their frozen closing figures;
//! an open session in a result page carries no closing, and callers must
//! recompute its running balance on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::OperatorId;
use tillbook_drawer::Session;

/// Pagination parameters for history queries (1-based page).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 25,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(25).clamp(1, 200), // Cap for safety
        }
    }

    /// Zero-based item offset of this page.
    ///
    /// Pages are 1-based, but the fields are public and deserializable, so
    /// a literal `page: 0` can reach here without going through `new`. It
    /// is treated as the first page rather than underflowing.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }
}


/// Filter criteria for history queries. All fields optional; an empty
/// filter matches every session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Sessions opened at or after this time.
    pub opened_after: Option<DateTime<Utc>>,
    /// Sessions opened at or before this time.
    pub opened_before: Option<DateTime<Utc>>,
    /// Sessions opened by this operator.
    pub operator_id: Option<OperatorId>,
    /// Case-insensitive match against the session note and movement
    /// descriptions.
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(after) = self.opened_after {
            if session.opened_at() < after {
                return false;
            }
        }
        if let Some(before) = self.opened_before {
            if session.opened_at() > before {
                return false;
            }
        }
        if let Some(operator_id) = self.operator_id {
            if session.operator_id() != operator_id {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_note = session
                .note()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            let in_movements = session
                .movements()
                .iter()
                .any(|m| m.description().to_lowercase().contains(&needle));
            if !in_note && !in_movements {
                return false;
            }
        }
        true
    }
}

/// Paginated history query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    /// The sessions on this page, newest `opened_at` first.
    pub items: Vec<Session>,
    /// Total number of sessions matching the filter (across all pages).
    pub total: u64,
    /// Pagination parameters used.
    pub pagination: Pagination,
    /// Whether more sessions are available past this page.
    pub has_more: bool,
}
