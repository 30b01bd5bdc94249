use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::RegionFilter;
use crate::sync::CycleId;
use crate::view::ActiveView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SearchTicket(pub u64);

impl fmt::Display for SearchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub ticket: SearchTicket,
    pub query: String,
    pub filter: RegionFilter,
}

/// Holds the search text and decides when it turns into a request.
///
/// Searches only run against the anomaly view. The latest issued ticket is
/// the only one whose result may be applied.
#[derive(Debug, Default)]
pub struct SearchRouter {
    query: String,
    last_ticket: u64,
    pending: Option<SearchTicket>,
    rerun_after: Option<CycleId>,
}

impl SearchRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub const fn pending(&self) -> Option<SearchTicket> {
        self.pending
    }

    /// Stores `text` and returns a request when the anomaly view is active.
    pub fn submit(
        &mut self,
        text: String,
        view: ActiveView,
        filter: &RegionFilter,
    ) -> Option<SearchRequest> {
        self.query = text;
        if view != ActiveView::Anomalies {
            return None;
        }
        Some(self.issue(filter))
    }

    /// Returns true when `ticket` is the latest issued search.
    pub fn settle(&mut self, ticket: SearchTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Forgets the pending search, so its result no longer applies.
    pub fn invalidate_pending(&mut self) -> Option<SearchTicket> {
        self.pending.take()
    }

    /// Marks the stored query to be re-issued once `cycle` publishes. Only
    /// applies while the anomaly view is active and the query is not blank.
    pub fn schedule_rerun(&mut self, view: ActiveView, cycle: CycleId) -> bool {
        if view == ActiveView::Anomalies && !self.query.trim().is_empty() {
            self.rerun_after = Some(cycle);
            true
        } else {
            self.rerun_after = None;
            false
        }
    }

    /// Issues the scheduled rerun once `cycle`, or any later cycle that
    /// superseded it, publishes.
    pub fn take_rerun(&mut self, cycle: CycleId, filter: &RegionFilter) -> Option<SearchRequest> {
        if !self.rerun_after.is_some_and(|after| cycle >= after) {
            return None;
        }
        self.rerun_after = None;
        Some(self.issue(filter))
    }

    pub fn cancel_rerun(&mut self) {
        self.rerun_after = None;
    }

    /// Clears query and pending work. The ticket counter keeps counting.
    pub fn reset(&mut self) {
        self.query.clear();
        self.pending = None;
        self.rerun_after = None;
    }

    fn issue(&mut self, filter: &RegionFilter) -> SearchRequest {
        self.last_ticket += 1;
        let ticket = SearchTicket(self.last_ticket);
        self.pending = Some(ticket);
        SearchRequest {
            ticket,
            query: self.query.clone(),
            filter: filter.clone(),
        }
    }
}
