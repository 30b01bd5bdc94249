use tracing::debug;

use crate::config::ConsoleConfig;
use crate::filter::FilterCascade;
use crate::report::ReportGenerator;
use crate::search::SearchRouter;
use crate::session::SessionStore;
use crate::sync::{DatasetTriple, Datasets, SyncController};
use crate::view::ActiveView;
use crate::AppError;

#[derive(Debug, Default)]
pub struct Model {
    pub config: ConsoleConfig,
    pub session: SessionStore,
    pub cascade: FilterCascade,
    pub sync: SyncController,
    pub search: SearchRouter,
    pub datasets: Datasets,
    pub report: ReportGenerator,
    pub active_view: ActiveView,
    pub is_loading: bool,
    pub active_error: Option<AppError>,
}

impl Model {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    /// Replaces all three region-scoped datasets in one step.
    pub fn publish(&mut self, triple: DatasetTriple) {
        self.datasets = Datasets::from(triple);
    }

    /// Returns every piece of controller state to its initial value. The
    /// config survives, and the sync, search and report counters keep counting.
    pub fn reset_controller(&mut self) {
        debug!("resetting controller state");
        self.cascade.reset();
        self.sync.reset();
        self.search.reset();
        self.datasets = Datasets::default();
        self.report.dismiss();
        self.active_view = ActiveView::default();
        self.is_loading = false;
        self.active_error = None;
    }
}
