//! Scenario state and shared utilities for merge request view BDD tests.

use std::sync::Arc;
use std::time::Duration;

use mergelens::gitlab::{
    CacheTtls, Fingerprint, GitLabError, ManualClock, MergeRequestViews, NormalizedView,
    ViewCache,
};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use wiremock::MockServer;

use crate::support::gitlab_fixtures::{PROJECT, gateway_for};
use crate::support::runtime::{SharedRuntime, scenario_runtime};

#[derive(ScenarioState, Default)]
pub(crate) struct ViewState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) clock: Slot<Arc<ManualClock>>,
    pub(crate) views: Slot<MergeRequestViews>,
    pub(crate) view_ttl_seconds: Slot<u64>,
    pub(crate) view: Slot<NormalizedView>,
    pub(crate) error: Slot<GitLabError>,
}

/// Returns the runtime, starting it and the mock server on first use.
pub(crate) fn shared_runtime(state: &ViewState) -> SharedRuntime {
    scenario_runtime(&state.runtime, &state.server)
        .unwrap_or_else(|error| panic!("failed to create Tokio runtime: {error}"))
}

/// Returns the scenario clock, creating it on first use.
pub(crate) fn scenario_clock(state: &ViewState) -> Arc<ManualClock> {
    if let Some(clock) = state.clock.get() {
        return clock;
    }
    let clock = Arc::new(ManualClock::new());
    state.clock.set(Arc::clone(&clock));
    clock
}

/// Returns the orchestrator wired to the mock server, building it once.
pub(crate) fn scenario_views(state: &ViewState) -> MergeRequestViews {
    if let Some(views) = state.views.get() {
        return views;
    }

    let clock = scenario_clock(state);
    let server_uri = state
        .server
        .with_ref(MockServer::uri)
        .unwrap_or_else(|| panic!("mock server not initialised"));
    let gateway = gateway_for(&server_uri, &clock)
        .unwrap_or_else(|error| panic!("gateway should build: {error}"));

    let mut ttls = CacheTtls::default();
    if let Some(seconds) = state.view_ttl_seconds.get() {
        ttls.view = Duration::from_secs(seconds);
    }
    let cache = ViewCache::new(clock).with_ttls(ttls);

    let views = MergeRequestViews::new(Arc::new(gateway), Arc::new(cache));
    state.views.set(views.clone());
    views
}

/// Fingerprint of merge request `iid` in the fixture project.
pub(crate) fn fingerprint(iid: u64) -> Fingerprint {
    Fingerprint::new(PROJECT, &iid.to_string())
        .unwrap_or_else(|error| panic!("valid fingerprint: {error}"))
}
