//! Sync cycle bookkeeping.
//!
//! A cycle issues the three region-scoped retrievals at once and joins them
//! here. The first failure fails the whole cycle; only when all three have
//! arrived is the triple handed back for publishing. Every cycle carries a
//! [`CycleId`], and responses for any cycle other than the one in flight are
//! dropped, so a slow cycle can never overwrite a newer one.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::api::{ClaimAnomaly, Facility, SummaryStats};
use crate::capabilities::{FetchError, TimerId};
use crate::filter::RegionFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    Manual,
    Automatic,
}

impl Trigger {
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Summary,
    Facilities,
    ClaimAnomalies,
}

impl Resource {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Facilities => "facilities",
            Self::ClaimAnomalies => "claim_anomalies",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourcePayload {
    Summary(SummaryStats),
    Facilities(Vec<Facility>),
    ClaimAnomalies(Vec<ClaimAnomaly>),
}

impl ResourcePayload {
    #[must_use]
    pub const fn resource(&self) -> Resource {
        match self {
            Self::Summary(_) => Resource::Summary,
            Self::Facilities(_) => Resource::Facilities,
            Self::ClaimAnomalies(_) => Resource::ClaimAnomalies,
        }
    }
}

/// The three region-scoped datasets of one successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetTriple {
    pub summary: SummaryStats,
    pub facilities: Vec<Facility>,
    pub anomalies: Vec<ClaimAnomaly>,
}

/// What the console currently shows. Replaced as a whole on publish; only
/// the anomaly member is overwritten separately, by search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Datasets {
    pub summary: Option<SummaryStats>,
    pub facilities: Vec<Facility>,
    pub anomalies: Vec<ClaimAnomaly>,
}

impl From<DatasetTriple> for Datasets {
    fn from(triple: DatasetTriple) -> Self {
        Self {
            summary: Some(triple.summary),
            facilities: triple.facilities,
            anomalies: triple.anomalies,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Success,
    PartialFailure,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    pub id: CycleId,
    pub trigger: Trigger,
    pub filter: RegionFilter,
}

#[derive(Debug, Default)]
struct Partial {
    summary: Option<SummaryStats>,
    facilities: Option<Vec<Facility>>,
    anomalies: Option<Vec<ClaimAnomaly>>,
}

impl Partial {
    fn store(&mut self, payload: ResourcePayload) {
        match payload {
            ResourcePayload::Summary(summary) => self.summary = Some(summary),
            ResourcePayload::Facilities(facilities) => self.facilities = Some(facilities),
            ResourcePayload::ClaimAnomalies(anomalies) => self.anomalies = Some(anomalies),
        }
    }

    fn take_complete(&mut self) -> Option<DatasetTriple> {
        if self.summary.is_none() || self.facilities.is_none() || self.anomalies.is_none() {
            return None;
        }
        Some(DatasetTriple {
            summary: self.summary.take()?,
            facilities: self.facilities.take()?,
            anomalies: self.anomalies.take()?,
        })
    }
}

#[derive(Debug)]
enum Phase {
    Fetching(Partial),
    Publishing,
    AwaitingMasterIndex,
}

#[derive(Debug)]
struct InFlight {
    ticket: CycleTicket,
    phase: Phase,
    yielded_ticks: u32,
}

/// Result of feeding one retrieval into the join.
#[derive(Debug, PartialEq)]
pub enum Progress {
    /// The response belongs to a cycle that is no longer in flight.
    Stale,
    Pending,
    Complete {
        ticket: CycleTicket,
        triple: DatasetTriple,
    },
    Failed {
        ticket: CycleTicket,
        resource: Resource,
        error: FetchError,
    },
}

/// Re-armed one-shot poll timer. Ids are never reused, so a tick from a
/// torn-down timer can always be told apart from the live one.
#[derive(Debug, Default)]
pub struct PollTimer {
    generation: u64,
    armed: Option<TimerId>,
}

impl PollTimer {
    pub fn start(&mut self) -> TimerId {
        self.generation += 1;
        let id = TimerId(self.generation);
        self.armed = Some(id);
        id
    }

    #[must_use]
    pub fn is_current(&self, id: TimerId) -> bool {
        self.armed == Some(id)
    }

    #[must_use]
    pub const fn armed(&self) -> Option<TimerId> {
        self.armed
    }

    pub fn stop(&mut self) -> Option<TimerId> {
        self.armed.take()
    }
}

#[derive(Debug, Default)]
pub struct SyncController {
    last_cycle: u64,
    session_floor: u64,
    in_flight: Option<InFlight>,
    last_outcome: Option<CycleOutcome>,
    poll: PollTimer,
}

impl SyncController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a cycle for `filter`, superseding whatever is in flight.
    ///
    /// An automatic trigger yields once to an in-flight manual cycle and
    /// returns `None`. Ticks arrive one poll period apart, so a manual cycle
    /// still open at the next tick has outlived a full period and is
    /// superseded.
    pub fn begin(&mut self, trigger: Trigger, filter: &RegionFilter) -> Option<CycleTicket> {
        if let Some(current) = self.in_flight.as_mut() {
            if !trigger.is_manual() && current.ticket.trigger.is_manual() {
                if current.yielded_ticks == 0 {
                    current.yielded_ticks += 1;
                    return None;
                }
                debug!(cycle = %current.ticket.id, "manual cycle outlived a poll period");
            }
            debug!(
                superseded = %current.ticket.id,
                trigger = trigger.as_str(),
                "superseding in-flight cycle"
            );
        }

        self.last_cycle += 1;
        let ticket = CycleTicket {
            id: CycleId(self.last_cycle),
            trigger,
            filter: filter.clone(),
        };
        self.in_flight = Some(InFlight {
            ticket: ticket.clone(),
            phase: Phase::Fetching(Partial::default()),
            yielded_ticks: 0,
        });
        Some(ticket)
    }

    pub fn accept(
        &mut self,
        cycle: CycleId,
        resource: Resource,
        result: Result<ResourcePayload, FetchError>,
    ) -> Progress {
        let Some(current) = self.in_flight.as_mut() else {
            return Progress::Stale;
        };
        if current.ticket.id != cycle {
            return Progress::Stale;
        }
        let Phase::Fetching(partial) = &mut current.phase else {
            return Progress::Stale;
        };

        let payload = match result {
            Ok(payload) => payload,
            Err(error) => {
                let ticket = current.ticket.clone();
                self.in_flight = None;
                self.last_outcome = Some(CycleOutcome::Offline);
                return Progress::Failed {
                    ticket,
                    resource,
                    error,
                };
            }
        };

        debug_assert_eq!(payload.resource(), resource, "payload tagged with wrong resource");
        partial.store(payload);
        match partial.take_complete() {
            Some(triple) => {
                current.phase = Phase::Publishing;
                Progress::Complete {
                    ticket: current.ticket.clone(),
                    triple,
                }
            }
            None => Progress::Pending,
        }
    }

    /// Keeps a published cycle open until its master-index fetch settles.
    pub fn await_master_index(&mut self, cycle: CycleId) -> bool {
        match self.in_flight.as_mut() {
            Some(current) if current.ticket.id == cycle => {
                current.phase = Phase::AwaitingMasterIndex;
                true
            }
            _ => false,
        }
    }

    /// Settles the master-index phase of `cycle`. Returns the ticket when
    /// that closed the cycle.
    pub fn settle_master_index(&mut self, cycle: CycleId, loaded: bool) -> Option<CycleTicket> {
        let awaiting = matches!(
            &self.in_flight,
            Some(InFlight { ticket, phase: Phase::AwaitingMasterIndex, .. }) if ticket.id == cycle
        );
        if !awaiting {
            return None;
        }
        let outcome = if loaded {
            CycleOutcome::Success
        } else {
            CycleOutcome::PartialFailure
        };
        self.finish(cycle, outcome)
    }

    pub fn finish(&mut self, cycle: CycleId, outcome: CycleOutcome) -> Option<CycleTicket> {
        if self.current_cycle() != Some(cycle) {
            return None;
        }
        self.last_outcome = Some(outcome);
        self.in_flight.take().map(|current| current.ticket)
    }

    #[must_use]
    pub fn current_cycle(&self) -> Option<CycleId> {
        self.in_flight.as_ref().map(|current| current.ticket.id)
    }

    #[must_use]
    pub fn in_flight_trigger(&self) -> Option<Trigger> {
        self.in_flight.as_ref().map(|current| current.ticket.trigger)
    }

    /// True when `cycle` was started after the last [`reset`](Self::reset).
    #[must_use]
    pub const fn in_session(&self, cycle: CycleId) -> bool {
        cycle.0 > self.session_floor
    }

    #[must_use]
    pub const fn last_outcome(&self) -> Option<CycleOutcome> {
        self.last_outcome
    }

    #[must_use]
    pub const fn poll(&self) -> &PollTimer {
        &self.poll
    }

    pub fn poll_mut(&mut self) -> &mut PollTimer {
        &mut self.poll
    }

    /// Drops in-flight work. Cycle and timer counters keep counting so that
    /// responses from before the reset stay stale.
    pub fn reset(&mut self) {
        self.session_floor = self.last_cycle;
        self.in_flight = None;
        self.last_outcome = None;
        self.poll.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HeadlineStats;

    fn summary(total: u64) -> SummaryStats {
        SummaryStats {
            stats: HeadlineStats {
                total_claims: total,
                ..HeadlineStats::default()
            },
            ..SummaryStats::default()
        }
    }

    fn facility(id: &str) -> Facility {
        Facility {
            facility_id: id.into(),
            ..Facility::default()
        }
    }

    fn anomaly(id: &str) -> ClaimAnomaly {
        ClaimAnomaly {
            claim_id: id.into(),
            ..ClaimAnomaly::default()
        }
    }

    fn feed_all(sync: &mut SyncController, cycle: CycleId) -> Progress {
        assert_eq!(
            sync.accept(cycle, Resource::Summary, Ok(ResourcePayload::Summary(summary(10)))),
            Progress::Pending
        );
        assert_eq!(
            sync.accept(
                cycle,
                Resource::ClaimAnomalies,
                Ok(ResourcePayload::ClaimAnomalies(vec![anomaly("C1")]))
            ),
            Progress::Pending
        );
        sync.accept(
            cycle,
            Resource::Facilities,
            Ok(ResourcePayload::Facilities(vec![facility("H1")])),
        )
    }

    #[test]
    fn test_cycle_ids_increase() {
        let mut sync = SyncController::new();
        let first = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        let second = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(second.id > first.id);
        assert_eq!(sync.current_cycle(), Some(second.id));
    }

    #[test]
    fn test_joins_all_three_in_any_order() {
        let mut sync = SyncController::new();
        let ticket = sync.begin(Trigger::Automatic, &RegionFilter::all()).unwrap();

        match feed_all(&mut sync, ticket.id) {
            Progress::Complete { ticket: done, triple } => {
                assert_eq!(done, ticket);
                assert_eq!(triple.summary.stats.total_claims, 10);
                assert_eq!(triple.facilities[0].facility_id, "H1");
                assert_eq!(triple.anomalies[0].claim_id, "C1");
            }
            other => panic!("expected complete cycle, got {other:?}"),
        }

        assert_eq!(sync.finish(ticket.id, CycleOutcome::Success), Some(ticket));
        assert_eq!(sync.current_cycle(), None);
        assert_eq!(sync.last_outcome(), Some(CycleOutcome::Success));
    }

    #[test]
    fn test_first_failure_fails_cycle_and_drops_rest() {
        let mut sync = SyncController::new();
        let ticket = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();

        sync.accept(ticket.id, Resource::Summary, Ok(ResourcePayload::Summary(summary(1))));
        let failed = sync.accept(
            ticket.id,
            Resource::Facilities,
            Err(FetchError::Status { status: 502 }),
        );
        assert!(matches!(
            failed,
            Progress::Failed { resource: Resource::Facilities, .. }
        ));
        assert_eq!(sync.last_outcome(), Some(CycleOutcome::Offline));

        let late = sync.accept(
            ticket.id,
            Resource::ClaimAnomalies,
            Ok(ResourcePayload::ClaimAnomalies(Vec::new())),
        );
        assert_eq!(late, Progress::Stale);
    }

    #[test]
    fn test_superseded_cycle_responses_are_stale() {
        let mut sync = SyncController::new();
        let old = sync.begin(Trigger::Automatic, &RegionFilter::all()).unwrap();
        let new = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();

        assert_eq!(
            sync.accept(old.id, Resource::Summary, Ok(ResourcePayload::Summary(summary(1)))),
            Progress::Stale
        );
        assert!(matches!(feed_all(&mut sync, new.id), Progress::Complete { .. }));
    }

    #[test]
    fn test_automatic_yields_to_manual_in_flight() {
        let mut sync = SyncController::new();
        let manual = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(sync.begin(Trigger::Automatic, &RegionFilter::all()).is_none());
        assert_eq!(sync.current_cycle(), Some(manual.id));
    }

    #[test]
    fn test_second_tick_supersedes_stuck_manual_cycle() {
        let mut sync = SyncController::new();
        let manual = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(sync.begin(Trigger::Automatic, &RegionFilter::all()).is_none());

        let automatic = sync.begin(Trigger::Automatic, &RegionFilter::all()).unwrap();
        assert!(automatic.id > manual.id);
        assert_eq!(sync.in_flight_trigger(), Some(Trigger::Automatic));
        assert_eq!(
            sync.accept(manual.id, Resource::Summary, Ok(ResourcePayload::Summary(summary(1)))),
            Progress::Stale
        );
    }

    #[test]
    fn test_yielded_tick_count_is_per_cycle() {
        let mut sync = SyncController::new();
        sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(sync.begin(Trigger::Automatic, &RegionFilter::all()).is_none());

        let fresh = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(sync.begin(Trigger::Automatic, &RegionFilter::all()).is_none());
        assert_eq!(sync.current_cycle(), Some(fresh.id));
    }

    #[test]
    fn test_automatic_supersedes_automatic() {
        let mut sync = SyncController::new();
        let first = sync.begin(Trigger::Automatic, &RegionFilter::all()).unwrap();
        let second = sync.begin(Trigger::Automatic, &RegionFilter::all()).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(sync.in_flight_trigger(), Some(Trigger::Automatic));
    }

    #[test]
    fn test_master_index_phase() {
        let mut sync = SyncController::new();
        let ticket = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(matches!(feed_all(&mut sync, ticket.id), Progress::Complete { .. }));

        assert!(sync.await_master_index(ticket.id));
        assert_eq!(sync.settle_master_index(CycleId(ticket.id.0 + 7), true), None);
        assert_eq!(sync.settle_master_index(ticket.id, false), Some(ticket));
        assert_eq!(sync.last_outcome(), Some(CycleOutcome::PartialFailure));
    }

    #[test]
    fn test_reset_keeps_ids_monotonic() {
        let mut sync = SyncController::new();
        let before = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        let timer = sync.poll_mut().start();
        sync.reset();

        assert_eq!(sync.current_cycle(), None);
        assert!(!sync.poll().is_current(timer));
        let after = sync.begin(Trigger::Manual, &RegionFilter::all()).unwrap();
        assert!(after.id > before.id);
        assert!(!sync.in_session(before.id));
        assert!(sync.in_session(after.id));
        assert_eq!(
            sync.accept(before.id, Resource::Summary, Ok(ResourcePayload::Summary(summary(1)))),
            Progress::Stale
        );
    }

    #[test]
    fn test_poll_timer_ids_are_never_reused() {
        let mut poll = PollTimer::default();
        let first = poll.start();
        assert!(poll.is_current(first));
        assert_eq!(poll.stop(), Some(first));
        let second = poll.start();
        assert_ne!(first, second);
        assert!(!poll.is_current(first));
        assert_eq!(poll.armed(), Some(second));
    }
}
