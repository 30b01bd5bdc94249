use crate::api::{AuditReport, ClaimAnomaly, Facility, LoginReply};
use crate::capabilities::{FetchError, TimerId, TimerOutput};
use crate::config::ConsoleConfig;
use crate::report::ReportTicket;
use crate::search::SearchTicket;
use crate::session::LoginCredentials;
use crate::sync::{CycleId, Resource, ResourcePayload};
use crate::view::ActiveView;

/// Everything that can happen to the console. User actions and shell
/// responses both arrive here; `update` is the only place they are handled.
#[derive(Debug)]
pub enum Event {
    // shell lifecycle
    AppStarted,
    Configure(ConsoleConfig),

    // session
    LoginSubmitted(LoginCredentials),
    LogoutRequested,

    // console
    RefreshRequested,
    StateSelected(String),
    DistrictSelected(String),
    ViewSelected(ActiveView),
    SearchSubmitted(String),
    ReportRequested,
    ReportDismissed,
    ErrorDismissed,

    // capability responses
    SessionRestored(Result<Option<Vec<u8>>, String>),
    SessionPersisted(Result<(), String>),
    SessionCleared(Result<(), String>),
    LoginSettled(Result<LoginReply, FetchError>),
    PollTimerElapsed {
        timer: TimerId,
        output: TimerOutput,
    },
    ResourceFetched {
        cycle: CycleId,
        resource: Resource,
        result: Result<ResourcePayload, FetchError>,
    },
    MasterIndexFetched {
        cycle: CycleId,
        result: Result<Vec<Facility>, FetchError>,
    },
    SearchSettled {
        ticket: SearchTicket,
        result: Result<Vec<ClaimAnomaly>, FetchError>,
    },
    ReportSettled {
        ticket: ReportTicket,
        result: Result<AuditReport, FetchError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::Configure(_) => "configure",
            Self::LoginSubmitted(_) => "login_submitted",
            Self::LogoutRequested => "logout_requested",
            Self::RefreshRequested => "refresh_requested",
            Self::StateSelected(_) => "state_selected",
            Self::DistrictSelected(_) => "district_selected",
            Self::ViewSelected(_) => "view_selected",
            Self::SearchSubmitted(_) => "search_submitted",
            Self::ReportRequested => "report_requested",
            Self::ReportDismissed => "report_dismissed",
            Self::ErrorDismissed => "error_dismissed",
            Self::SessionRestored(_) => "session_restored",
            Self::SessionPersisted(_) => "session_persisted",
            Self::SessionCleared(_) => "session_cleared",
            Self::LoginSettled(_) => "login_settled",
            Self::PollTimerElapsed { .. } => "poll_timer_elapsed",
            Self::ResourceFetched { .. } => "resource_fetched",
            Self::MasterIndexFetched { .. } => "master_index_fetched",
            Self::SearchSettled { .. } => "search_settled",
            Self::ReportSettled { .. } => "report_settled",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::LoginSubmitted(_)
                | Self::LogoutRequested
                | Self::RefreshRequested
                | Self::StateSelected(_)
                | Self::DistrictSelected(_)
                | Self::ViewSelected(_)
                | Self::SearchSubmitted(_)
                | Self::ReportRequested
                | Self::ReportDismissed
                | Self::ErrorDismissed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_event_name_matches_refresh() {
        assert_eq!(Event::RefreshRequested.name(), crate::view::RETRY_EVENT);
    }

    #[test]
    fn test_user_initiated_classification() {
        assert!(Event::StateSelected("Kerala".into()).is_user_initiated());
        assert!(Event::SearchSubmitted("ABC".into()).is_user_initiated());
        assert!(!Event::AppStarted.is_user_initiated());
        assert!(!Event::PollTimerElapsed {
            timer: TimerId(1),
            output: TimerOutput::Elapsed
        }
        .is_user_initiated());
    }

    #[test]
    fn test_debug_never_shows_password() {
        let event = Event::LoginSubmitted(LoginCredentials::new("analyst", "hunter2"));
        assert!(!format!("{event:?}").contains("hunter2"));
    }
}
