use tracing::{debug, info, trace, warn};

use crate::api::{AuditReport, ClaimAnomaly, Facility, LoginReply, SummaryStats};
use crate::capabilities::{
    request_id, settle, storage_result, Capabilities, FetchError, TimerId, TimerOutput,
    REQUEST_ID_HEADER,
};
use crate::event::Event;
use crate::filter::{FilterChange, Region, RegionFilter};
use crate::model::Model;
use crate::report::ReportTicket;
use crate::search::SearchRequest;
use crate::session::{Identity, LoginCredentials};
use crate::sync::{CycleId, CycleOutcome, CycleTicket, Progress, Resource, ResourcePayload, Trigger};
use crate::view::{self, ViewModel};
use crate::{
    AppError, ErrorKind, INVALID_CREDENTIALS_MESSAGE, LOGIN_TRANSPORT_MESSAGE,
};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_user_initiated() {
            debug!(event = event.name(), "user action");
        } else {
            trace!(event = event.name(), "event");
        }

        match event {
            Event::AppStarted => {
                match model.config.session_key() {
                    Ok(key) => caps.key_value.get(key.into_string(), |result| {
                        Event::SessionRestored(storage_result(result))
                    }),
                    Err(e) => warn!(error = %e, "session key invalid, skipping restore"),
                }
                caps.render.render();
            }

            Event::Configure(config) => {
                match config.validate() {
                    Ok(()) => {
                        info!(
                            api_base_url = %config.api_base_url,
                            poll_interval_ms = config.poll_interval_ms,
                            "console configured"
                        );
                        model.config = config;
                    }
                    Err(e) => {
                        warn!(error = %e, "rejected console configuration");
                        model.set_error(e.into());
                    }
                }
                caps.render.render();
            }

            Event::SessionRestored(result) => {
                if model.is_authenticated() {
                    debug!("session already established, ignoring stored identity");
                    return;
                }
                match result {
                    Ok(Some(bytes)) => match Identity::from_stored(bytes) {
                        Ok(identity) => {
                            info!(identity = %identity, "restored session");
                            Self::start_session(identity, model, caps);
                        }
                        Err(e) => warn!(error = %e, "discarding unreadable stored identity"),
                    },
                    Ok(None) => debug!("no stored session"),
                    Err(e) => warn!(error = %e, "failed to read stored session"),
                }
                caps.render.render();
            }

            Event::LoginSubmitted(credentials) => {
                if model.is_authenticated() {
                    debug!("login ignored, already signed in");
                    return;
                }
                if let Err(e) = credentials.validate() {
                    model.session.reject_login(e.to_string());
                    caps.render.render();
                    return;
                }
                if !model.session.begin_login() {
                    debug!("login already in flight");
                    return;
                }
                Self::send_login(&credentials, model, caps);
                caps.render.render();
            }

            Event::LoginSettled(result) => {
                if !model.session.is_submitting() {
                    debug!("dropping login reply with no login in flight");
                    return;
                }
                Self::settle_login(result, model, caps);
                caps.render.render();
            }

            Event::SessionPersisted(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to persist session");
                }
            }

            Event::LogoutRequested => {
                if let Some(timer) = model.sync.poll_mut().stop() {
                    caps.timer.clear(timer);
                }
                let identity = model.session.sign_out();
                model.reset_controller();
                match model.config.session_key() {
                    Ok(key) => caps.key_value.delete(key.into_string(), |result| {
                        Event::SessionCleared(storage_result(result).map(|_| ()))
                    }),
                    Err(e) => warn!(error = %e, "session key invalid, nothing to delete"),
                }
                info!(had_session = identity.is_some(), "signed out");
                caps.render.render();
            }

            Event::SessionCleared(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to delete stored session");
                }
            }

            Event::PollTimerElapsed { timer, output } => {
                if !model.sync.poll().is_current(timer) {
                    debug!(%timer, "ignoring tick from a torn-down poll timer");
                    return;
                }
                if output == TimerOutput::Cleared {
                    debug!(%timer, "poll timer cleared by shell, re-arming");
                }
                Self::arm_poll_timer(timer, model, caps);
                if Self::refresh(Trigger::Automatic, model, caps).is_some() {
                    caps.render.render();
                }
            }

            Event::RefreshRequested => {
                Self::refresh(Trigger::Manual, model, caps);
                caps.render.render();
            }

            Event::StateSelected(value) => {
                if !model.is_authenticated() {
                    return;
                }
                match model.cascade.select_state(Region::parse(&value)) {
                    Ok(FilterChange::Changed) => Self::filter_changed(model, caps),
                    Ok(FilterChange::Unchanged) => {}
                    Err(e) => warn!(error = %e, "state selection rejected"),
                }
                caps.render.render();
            }

            Event::DistrictSelected(value) => {
                if !model.is_authenticated() {
                    return;
                }
                match model.cascade.select_district(Region::parse(&value)) {
                    Ok(FilterChange::Changed) => Self::filter_changed(model, caps),
                    Ok(FilterChange::Unchanged) => {}
                    Err(e) => warn!(error = %e, "district selection rejected"),
                }
                caps.render.render();
            }

            Event::ViewSelected(view) => {
                model.active_view = view;
                caps.render.render();
            }

            Event::SearchSubmitted(text) => {
                if !model.is_authenticated() {
                    return;
                }
                let request = model
                    .search
                    .submit(text, model.active_view, model.cascade.filter());
                match request {
                    Some(request) => Self::send_search(request, model, caps),
                    None => debug!("search stored, anomaly view inactive"),
                }
                caps.render.render();
            }

            Event::ResourceFetched {
                cycle,
                resource,
                result,
            } => match model.sync.accept(cycle, resource, result) {
                Progress::Stale => {
                    debug!(%cycle, resource = resource.name(), "dropping response from superseded cycle");
                }
                Progress::Pending => {}
                Progress::Failed {
                    ticket,
                    resource,
                    error,
                } => {
                    Self::cycle_failed(&ticket, resource, error, model);
                    caps.render.render();
                }
                Progress::Complete { ticket, triple } => {
                    info!(
                        cycle = %ticket.id,
                        trigger = ticket.trigger.as_str(),
                        filter = %ticket.filter,
                        facilities = triple.facilities.len(),
                        anomalies = triple.anomalies.len(),
                        "publishing datasets"
                    );
                    model.publish(triple);

                    if model.cascade.master_index_is_empty() {
                        model.sync.await_master_index(ticket.id);
                        Self::fetch_master_index(ticket.id, model, caps);
                    } else if model.sync.finish(ticket.id, CycleOutcome::Success).is_some() {
                        model.is_loading = false;
                    }

                    if let Some(request) = model.search.take_rerun(ticket.id, model.cascade.filter())
                    {
                        Self::send_search(request, model, caps);
                    }
                    caps.render.render();
                }
            },

            Event::MasterIndexFetched { cycle, result } => {
                if !model.is_authenticated() || !model.sync.in_session(cycle) {
                    debug!(%cycle, "dropping master index from a closed session");
                    return;
                }
                let loaded = match result {
                    Ok(facilities) => {
                        if model.cascade.master_index_is_empty() {
                            model.cascade.load_master_index(facilities);
                            info!(
                                %cycle,
                                facilities = model.cascade.master_index_len(),
                                states = model.cascade.state_options().len(),
                                "master facility index loaded"
                            );
                        } else {
                            debug!(%cycle, "master facility index already loaded");
                        }
                        true
                    }
                    Err(e) => {
                        warn!(%cycle, error = %e, "master facility index fetch failed, retrying next cycle");
                        false
                    }
                };
                if model.sync.settle_master_index(cycle, loaded).is_some() {
                    model.is_loading = false;
                }
                caps.render.render();
            }

            Event::SearchSettled { ticket, result } => {
                if !model.search.settle(ticket) {
                    debug!(%ticket, "dropping superseded search result");
                    return;
                }
                model.is_loading = false;
                match result {
                    Ok(rows) => {
                        debug!(%ticket, rows = rows.len(), "applying search result");
                        model.datasets.anomalies = rows;
                    }
                    Err(e) => warn!(%ticket, error = %e, "claim search failed"),
                }
                caps.render.render();
            }

            Event::ReportRequested => {
                if !model.is_authenticated() {
                    return;
                }
                let filter = model.cascade.filter().clone();
                let Some(ticket) = model.report.begin(filter.clone()) else {
                    debug!("report already generating");
                    return;
                };
                Self::send_report_request(ticket, &filter, model, caps);
                caps.render.render();
            }

            Event::ReportSettled { ticket, result } => {
                if model.report.pending() != Some(ticket) {
                    debug!(%ticket, "dropping report for a generation no longer in progress");
                    return;
                }
                let report = match result {
                    Ok(report) => Some(report),
                    Err(e) => {
                        warn!(%ticket, error = %e, "report generation failed");
                        None
                    }
                };
                model.report.settle(ticket, report);
                caps.render.render();
            }

            Event::ReportDismissed => {
                model.report.dismiss();
                caps.render.render();
            }

            Event::ErrorDismissed => {
                model.clear_error();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::project(model)
    }
}

impl App {
    fn start_session(identity: Identity, model: &mut Model, caps: &Capabilities) {
        model.session.sign_in(identity);
        let timer = model.sync.poll_mut().start();
        Self::arm_poll_timer(timer, model, caps);
        Self::refresh(Trigger::Manual, model, caps);
    }

    fn arm_poll_timer(timer: TimerId, model: &Model, caps: &Capabilities) {
        caps.timer
            .start(timer, model.config.poll_interval(), move |output| {
                Event::PollTimerElapsed { timer, output }
            });
    }

    /// Starts a sync cycle for the current filter. Returns the cycle id, or
    /// `None` when nothing was started.
    fn refresh(trigger: Trigger, model: &mut Model, caps: &Capabilities) -> Option<CycleId> {
        if !model.is_authenticated() {
            debug!(trigger = trigger.as_str(), "refresh skipped, no session");
            return None;
        }
        let Some(ticket) = model.sync.begin(trigger, model.cascade.filter()) else {
            debug!("automatic refresh skipped, manual cycle in flight");
            return None;
        };

        if trigger.is_manual() {
            model.is_loading = true;
        }
        model.clear_error();

        let routes = match model.config.routes() {
            Ok(routes) => routes,
            Err(e) => {
                let error = FetchError::from(e);
                if let Progress::Failed {
                    ticket,
                    resource,
                    error,
                } = model.sync.accept(ticket.id, Resource::Summary, Err(error))
                {
                    Self::cycle_failed(&ticket, resource, error, model);
                }
                return None;
            }
        };

        let cycle = ticket.id;
        let filter = &ticket.filter;
        debug!(%cycle, trigger = trigger.as_str(), %filter, "starting sync cycle");

        caps.http
            .get(routes.summary(filter).as_str())
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<SummaryStats>()
            .send(move |result| Event::ResourceFetched {
                cycle,
                resource: Resource::Summary,
                result: settle(result).map(ResourcePayload::Summary),
            });

        caps.http
            .get(routes.facilities(filter).as_str())
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<Vec<Facility>>()
            .send(move |result| Event::ResourceFetched {
                cycle,
                resource: Resource::Facilities,
                result: settle(result).map(ResourcePayload::Facilities),
            });

        caps.http
            .get(
                routes
                    .claim_anomalies(model.config.anomaly_page_size, filter)
                    .as_str(),
            )
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<Vec<ClaimAnomaly>>()
            .send(move |result| Event::ResourceFetched {
                cycle,
                resource: Resource::ClaimAnomalies,
                result: settle(result).map(ResourcePayload::ClaimAnomalies),
            });

        Some(cycle)
    }

    fn cycle_failed(ticket: &CycleTicket, resource: Resource, error: FetchError, model: &mut Model) {
        model.is_loading = false;
        model.search.cancel_rerun();

        if ticket.trigger.is_manual() {
            warn!(
                cycle = %ticket.id,
                resource = resource.name(),
                error = %error,
                "manual sync cycle failed"
            );
            model.set_error(
                AppError::from(error)
                    .with_context("cycle", ticket.id.to_string())
                    .with_context("resource", resource.name()),
            );
        } else {
            warn!(
                cycle = %ticket.id,
                resource = resource.name(),
                error = %error,
                "automatic sync cycle failed, retrying on next tick"
            );
        }
    }

    fn filter_changed(model: &mut Model, caps: &Capabilities) {
        model.search.invalidate_pending();
        match Self::refresh(Trigger::Manual, model, caps) {
            Some(cycle) => {
                model.search.schedule_rerun(model.active_view, cycle);
            }
            None => model.search.cancel_rerun(),
        }
    }

    fn fetch_master_index(cycle: CycleId, model: &mut Model, caps: &Capabilities) {
        let url = match model.config.routes() {
            Ok(routes) => routes.facilities(&RegionFilter::all()),
            Err(e) => {
                warn!(%cycle, error = %e, "cannot build master index URL");
                if model.sync.settle_master_index(cycle, false).is_some() {
                    model.is_loading = false;
                }
                return;
            }
        };

        debug!(%cycle, "fetching master facility index");
        caps.http
            .get(url.as_str())
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<Vec<Facility>>()
            .send(move |result| Event::MasterIndexFetched {
                cycle,
                result: settle(result),
            });
    }

    fn send_search(request: SearchRequest, model: &mut Model, caps: &Capabilities) {
        let url = match model.config.routes() {
            Ok(routes) => routes.claim_search(&request.query, &request.filter),
            Err(e) => {
                warn!(error = %e, "cannot build search URL");
                model.search.settle(request.ticket);
                return;
            }
        };

        model.is_loading = true;
        let ticket = request.ticket;
        debug!(%ticket, filter = %request.filter, "issuing claim search");
        caps.http
            .get(url.as_str())
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<Vec<ClaimAnomaly>>()
            .send(move |result| Event::SearchSettled {
                ticket,
                result: settle(result),
            });
    }

    fn send_login(credentials: &LoginCredentials, model: &mut Model, caps: &Capabilities) {
        let url = match model.config.routes() {
            Ok(routes) => routes.login(),
            Err(e) => {
                warn!(error = %e, "cannot build login URL");
                model.session.reject_login(LOGIN_TRANSPORT_MESSAGE);
                return;
            }
        };
        let body = match credentials.to_body() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode login request");
                model.session.reject_login(LOGIN_TRANSPORT_MESSAGE);
                return;
            }
        };

        caps.http
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .body_bytes(body)
            .expect_json::<LoginReply>()
            .send(|result| Event::LoginSettled(settle(result)));
    }

    fn settle_login(result: Result<LoginReply, FetchError>, model: &mut Model, caps: &Capabilities) {
        let reply = match result {
            Ok(reply) => reply,
            Err(FetchError::Status { status }) if (400..500).contains(&status) => {
                info!(status, "login rejected");
                model.session.reject_login(INVALID_CREDENTIALS_MESSAGE);
                return;
            }
            Err(e) => {
                let error = AppError::new(ErrorKind::Network, LOGIN_TRANSPORT_MESSAGE)
                    .with_internal(e.to_string());
                warn!(error = %error, "login exchange failed");
                model.session.reject_login(error.message);
                return;
            }
        };

        if !reply.is_success() {
            let message = reply
                .detail
                .filter(|detail| !detail.trim().is_empty())
                .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());
            info!(status = %reply.status, "login rejected");
            model.session.reject_login(message);
            return;
        }

        let identity = match Identity::new(reply.username) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "login reply carried no usable username");
                model.session.reject_login(INVALID_CREDENTIALS_MESSAGE);
                return;
            }
        };

        match model.config.session_key() {
            Ok(key) => caps.key_value.set(key.into_string(), identity.to_stored(), |result| {
                Event::SessionPersisted(storage_result(result).map(|_| ()))
            }),
            Err(e) => warn!(error = %e, "session key invalid, session will not persist"),
        }

        info!(identity = %identity, "signed in");
        Self::start_session(identity, model, caps);
    }

    fn send_report_request(
        ticket: ReportTicket,
        filter: &RegionFilter,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let url = match model.config.routes() {
            Ok(routes) => routes.report(filter),
            Err(e) => {
                warn!(error = %e, "cannot build report URL");
                model.report.settle(ticket, None);
                return;
            }
        };

        debug!(%ticket, %filter, "requesting audit report");
        caps.http
            .get(url.as_str())
            .header(REQUEST_ID_HEADER, request_id().as_str())
            .expect_json::<AuditReport>()
            .send(move |result| Event::ReportSettled {
                ticket,
                result: settle(result),
            });
    }
}
