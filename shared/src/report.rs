use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::AuditReport;
use crate::filter::RegionFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportTicket(pub u64);

impl fmt::Display for ReportTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "report-{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportState {
    #[default]
    Idle,
    Generating {
        ticket: ReportTicket,
        filter: RegionFilter,
    },
    Ready {
        filter: RegionFilter,
        report: AuditReport,
    },
}

/// Audit-report generation, one request at a time. Only the reply carrying
/// the ticket of the generation in progress is applied.
#[derive(Debug, Default)]
pub struct ReportGenerator {
    last_ticket: u64,
    state: ReportState,
}

impl ReportGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ReportState {
        &self.state
    }

    #[must_use]
    pub const fn is_generating(&self) -> bool {
        matches!(self.state, ReportState::Generating { .. })
    }

    #[must_use]
    pub const fn pending(&self) -> Option<ReportTicket> {
        match self.state {
            ReportState::Generating { ticket, .. } => Some(ticket),
            ReportState::Idle | ReportState::Ready { .. } => None,
        }
    }

    /// Moves to `Generating` and returns its ticket. `None` if a report is
    /// already being generated.
    pub fn begin(&mut self, filter: RegionFilter) -> Option<ReportTicket> {
        if self.is_generating() {
            return None;
        }
        self.last_ticket += 1;
        let ticket = ReportTicket(self.last_ticket);
        self.state = ReportState::Generating { ticket, filter };
        Some(ticket)
    }

    /// Applies a finished generation. Replies for any other ticket are
    /// ignored and `false` is returned.
    pub fn settle(&mut self, ticket: ReportTicket, report: Option<AuditReport>) -> bool {
        if self.pending() != Some(ticket) {
            return false;
        }
        let filter = match std::mem::take(&mut self.state) {
            ReportState::Generating { filter, .. } => filter,
            ReportState::Idle | ReportState::Ready { .. } => return false,
        };
        self.state = match report {
            Some(report) => ReportState::Ready { filter, report },
            None => ReportState::Idle,
        };
        true
    }

    /// Returns to `Idle`. The ticket counter keeps counting.
    pub fn dismiss(&mut self) {
        self.state = ReportState::Idle;
    }

    #[must_use]
    pub const fn report(&self) -> Option<&AuditReport> {
        match &self.state {
            ReportState::Ready { report, .. } => Some(report),
            ReportState::Idle | ReportState::Generating { .. } => None,
        }
    }
}
