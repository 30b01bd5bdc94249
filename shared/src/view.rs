//! Active view selection and the view-model projection.

use serde::{Deserialize, Serialize};

use crate::api::{
    AnomalyTypeCount, AuditReport, ClaimAnomaly, Facility, FacilityTypeRisk, HeadlineStats,
    MonthlyTrend, RiskBucket,
};
use crate::filter::{Region, RegionFilter};
use crate::model::Model;
use crate::report::ReportState;
use crate::AppError;

pub const NO_ANALYTICS_MESSAGE: &str = "No analytics available for the current filter yet.";
pub const NO_FACILITIES_MESSAGE: &str = "No facilities match the current filter.";
pub const NO_ANOMALIES_MESSAGE: &str = "No anomalous claims match the current filter.";
pub const NATIONAL_SCOPE_LABEL: &str = "National Level";

/// Event name a shell sends to retry after a connectivity error.
pub const RETRY_EVENT: &str = "refresh_requested";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveView {
    #[default]
    Overview,
    FacilityRisk,
    Anomalies,
    Report,
}

impl ActiveView {
    pub const ALL: [Self; 4] = [
        Self::Overview,
        Self::FacilityRisk,
        Self::Anomalies,
        Self::Report,
    ];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::FacilityRisk => "hospitals",
            Self::Anomalies => "claims",
            Self::Report => "report",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::FacilityRisk => "Hospital Risk",
            Self::Anomalies => "Claim Anomalies",
            Self::Report => "Audit Report",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.id() == id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Screen {
    Login {
        is_submitting: bool,
        error: Option<String>,
    },
    Console(ConsoleView),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConsoleView {
    pub identity: String,
    pub navigation: Vec<NavItem>,
    pub filter: FilterBar,
    pub is_loading: bool,
    pub error: Option<UserFacingError>,
    pub content: Content,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NavItem {
    pub id: String,
    pub label: String,
    pub is_active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FilterBar {
    pub state: String,
    pub district: String,
    pub state_options: Vec<String>,
    pub district_options: Vec<String>,
    pub district_enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub error_code: String,
    pub is_retryable: bool,
    pub retry_event: Option<String>,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        let is_retryable = error.is_retryable();
        Self {
            message: error.user_facing_message(),
            error_code: error.code().to_string(),
            is_retryable,
            retry_event: is_retryable.then(|| RETRY_EVENT.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Content {
    Overview(OverviewContent),
    FacilityRisk(TableContent<Facility>),
    Anomalies(AnomalyContent),
    Report(ReportContent),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OverviewContent {
    pub scope_label: String,
    pub stats: Option<HeadlineStats>,
    pub risk_rate_percent: f64,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub risk_distribution: Vec<RiskBucket>,
    pub facility_type_risk: Vec<FacilityTypeRisk>,
    pub anomaly_type_counts: Vec<AnomalyTypeCount>,
    pub empty_message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TableContent<T> {
    pub rows: Vec<T>,
    pub empty_message: Option<String>,
}

impl<T: Clone> TableContent<T> {
    fn of(rows: &[T], empty: &str) -> Self {
        Self {
            rows: rows.to_vec(),
            empty_message: rows.is_empty().then(|| empty.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnomalyContent {
    pub search_query: String,
    pub table: TableContent<ClaimAnomaly>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportContent {
    pub scope: RegionFilter,
    pub is_generating: bool,
    pub report: Option<AuditReport>,
}

#[must_use]
pub fn project(model: &Model) -> ViewModel {
    let screen = match model.session.identity() {
        None => Screen::Login {
            is_submitting: model.session.is_submitting(),
            error: model.session.login_error().map(str::to_string),
        },
        Some(identity) => Screen::Console(ConsoleView {
            identity: identity.to_string(),
            navigation: navigation(model.active_view),
            filter: filter_bar(model),
            is_loading: model.is_loading,
            error: model.active_error.as_ref().map(UserFacingError::from),
            content: content(model),
        }),
    };
    ViewModel { screen }
}

fn navigation(active: ActiveView) -> Vec<NavItem> {
    ActiveView::ALL
        .into_iter()
        .map(|view| NavItem {
            id: view.id().to_string(),
            label: view.label().to_string(),
            is_active: view == active,
        })
        .collect()
}

fn filter_bar(model: &Model) -> FilterBar {
    let filter = model.cascade.filter();
    FilterBar {
        state: filter.state().to_string(),
        district: filter.district().to_string(),
        state_options: model.cascade.state_options().to_vec(),
        district_options: model.cascade.district_options().to_vec(),
        district_enabled: !filter.state().is_all(),
    }
}

fn content(model: &Model) -> Content {
    let datasets = &model.datasets;
    match model.active_view {
        ActiveView::Overview => {
            let summary = datasets.summary.as_ref();
            let scope_label = match model.cascade.filter().state() {
                Region::All => NATIONAL_SCOPE_LABEL.to_string(),
                Region::Named(state) => state.clone(),
            };
            Content::Overview(OverviewContent {
                scope_label,
                stats: summary.map(|s| s.stats.clone()),
                risk_rate_percent: summary.map_or(0.0, |s| s.stats.risk_rate_percent()),
                monthly_trends: summary.map(|s| s.monthly_trends.clone()).unwrap_or_default(),
                risk_distribution: summary
                    .map(|s| s.risk_distribution.clone())
                    .unwrap_or_default(),
                facility_type_risk: summary
                    .map(|s| s.facility_type_risk.clone())
                    .unwrap_or_default(),
                anomaly_type_counts: summary
                    .map(|s| s.anomaly_type_counts.clone())
                    .unwrap_or_default(),
                empty_message: summary.is_none().then(|| NO_ANALYTICS_MESSAGE.to_string()),
            })
        }
        ActiveView::FacilityRisk => Content::FacilityRisk(TableContent::of(
            &datasets.facilities,
            NO_FACILITIES_MESSAGE,
        )),
        ActiveView::Anomalies => Content::Anomalies(AnomalyContent {
            search_query: model.search.query().to_string(),
            table: TableContent::of(&datasets.anomalies, NO_ANOMALIES_MESSAGE),
        }),
        ActiveView::Report => {
            let (scope, report) = match model.report.state() {
                ReportState::Idle => (model.cascade.filter().clone(), None),
                ReportState::Generating { filter, .. } => (filter.clone(), None),
                ReportState::Ready { filter, report } => (filter.clone(), Some(report.clone())),
            };
            Content::Report(ReportContent {
                scope,
                is_generating: model.report.is_generating(),
                report,
            })
        }
    }
}
