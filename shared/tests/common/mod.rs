#![allow(dead_code)]

use claims_console_core::api::{ClaimAnomaly, Facility, HeadlineStats, LoginReply, SummaryStats};
use claims_console_core::capabilities::{FetchError, TimerOperation};
use claims_console_core::session::LoginCredentials;
use claims_console_core::sync::{CycleId, Resource, ResourcePayload};
use claims_console_core::{App, Effect, Event, Model};
use crux_core::testing::{AppTester, Update};

pub type Tester = AppTester<App, Effect>;

pub fn facility(id: &str, state: &str, district: &str) -> Facility {
    Facility {
        facility_id: id.into(),
        name: format!("Facility {id}"),
        state: state.into(),
        district: district.into(),
        ..Facility::default()
    }
}

pub fn anomaly(id: &str) -> ClaimAnomaly {
    ClaimAnomaly {
        claim_id: id.into(),
        risk_score: 0.9,
        ..ClaimAnomaly::default()
    }
}

pub fn summary(total: u64, suspicious: u64) -> SummaryStats {
    SummaryStats {
        stats: HeadlineStats {
            total_claims: total,
            suspicious_claims: suspicious,
            ..HeadlineStats::default()
        },
        ..SummaryStats::default()
    }
}

pub fn master_index() -> Vec<Facility> {
    vec![
        facility("H1", "Kerala", "Kochi"),
        facility("H2", "Bihar", "Patna"),
        facility("H3", "Kerala", "Thrissur"),
        facility("H4", "Assam", "Jorhat"),
        facility("H5", "Bihar", "Gaya"),
    ]
}

pub fn http_urls(update: &Update<Effect, Event>) -> Vec<String> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation.url.clone()),
            _ => None,
        })
        .collect()
}

pub fn http_methods(update: &Update<Effect, Event>) -> Vec<String> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation.method.clone()),
            _ => None,
        })
        .collect()
}

pub fn timer_operations(update: &Update<Effect, Event>) -> Vec<TimerOperation> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Timer(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn renders(update: &Update<Effect, Event>) -> bool {
    update
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::Render(_)))
}

pub fn touches_storage(update: &Update<Effect, Event>) -> bool {
    update
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::KeyValue(_)))
}

pub fn login_success(username: &str) -> LoginReply {
    LoginReply {
        status: "success".into(),
        username: username.into(),
        detail: None,
    }
}

/// Signs in as `analyst`, returning the update of the login reply.
pub fn sign_in(app: &Tester, model: &mut Model) -> Update<Effect, Event> {
    app.update(
        Event::LoginSubmitted(LoginCredentials::new("analyst", "hunter2")),
        model,
    );
    app.update(Event::LoginSettled(Ok(login_success("analyst"))), model)
}

pub fn current_cycle(model: &Model) -> CycleId {
    model
        .sync
        .current_cycle()
        .expect("a sync cycle should be in flight")
}

/// Answers the three retrievals of `cycle` successfully, returning the update
/// of the last one.
pub fn complete_cycle(
    app: &Tester,
    model: &mut Model,
    cycle: CycleId,
    summary: SummaryStats,
    facilities: Vec<Facility>,
    anomalies: Vec<ClaimAnomaly>,
) -> Update<Effect, Event> {
    app.update(
        Event::ResourceFetched {
            cycle,
            resource: Resource::Summary,
            result: Ok(ResourcePayload::Summary(summary)),
        },
        model,
    );
    app.update(
        Event::ResourceFetched {
            cycle,
            resource: Resource::Facilities,
            result: Ok(ResourcePayload::Facilities(facilities)),
        },
        model,
    );
    app.update(
        Event::ResourceFetched {
            cycle,
            resource: Resource::ClaimAnomalies,
            result: Ok(ResourcePayload::ClaimAnomalies(anomalies)),
        },
        model,
    )
}

pub fn fail_resource(
    app: &Tester,
    model: &mut Model,
    cycle: CycleId,
    resource: Resource,
) -> Update<Effect, Event> {
    app.update(
        Event::ResourceFetched {
            cycle,
            resource,
            result: Err(FetchError::Status { status: 503 }),
        },
        model,
    )
}

/// Signs in and drives the initial cycle plus the master index fetch to
/// completion.
pub fn signed_in_with_index(app: &Tester, model: &mut Model) {
    sign_in(app, model);
    let cycle = current_cycle(model);
    complete_cycle(
        app,
        model,
        cycle,
        summary(100, 10),
        master_index(),
        vec![anomaly("C1")],
    );
    app.update(
        Event::MasterIndexFetched {
            cycle,
            result: Ok(master_index()),
        },
        model,
    );
}
