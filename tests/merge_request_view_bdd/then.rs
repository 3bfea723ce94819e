//! Then steps for merge request view behavioural tests.

use std::time::Duration;

use rstest_bdd_macros::then;

use crate::merge_request_view_bdd_state::{ViewState, scenario_clock, scenario_views};

fn loaded_view(view_state: &ViewState) -> mergelens::NormalizedView {
    view_state.view.get().unwrap_or_else(|| {
        let error = view_state.error.get();
        panic!("merge request view missing; last error: {error:?}")
    })
}

#[then("the view title is {expected}")]
fn assert_title(view_state: &ViewState, expected: String) {
    assert_eq!(loaded_view(view_state).title, expected.trim_matches('"'));
}

#[then("the view state is {expected}")]
fn assert_state(view_state: &ViewState, expected: String) {
    assert_eq!(loaded_view(view_state).state, expected.trim_matches('"'));
}

#[then("loading fails with {kind}")]
fn assert_error_kind(view_state: &ViewState, kind: String) {
    let error = view_state
        .error
        .get()
        .unwrap_or_else(|| panic!("expected a failure, got a view"));
    assert_eq!(error.kind.as_code(), kind.trim());
}

#[then("the GraphQL request count is {count:usize}")]
fn assert_graphql_requests(view_state: &ViewState, count: usize) {
    let runtime = view_state
        .runtime
        .get()
        .unwrap_or_else(|| panic!("runtime not initialised"));
    let received = view_state
        .server
        .with_ref(|server| runtime.block_on(server.received_requests()))
        .flatten()
        .unwrap_or_else(|| panic!("request recording unavailable"));

    let graphql = received
        .iter()
        .filter(|request| request.url.path() == "/api/graphql")
        .count();
    assert_eq!(graphql, count, "unexpected number of GraphQL requests");
}

#[then("the view cache size is {count:usize}")]
fn assert_view_cache_size(view_state: &ViewState, count: usize) {
    assert_eq!(scenario_views(view_state).cache_stats().main_size, count);
}

#[then("the client waited {seconds:u64} seconds before retrying")]
fn assert_retry_wait(view_state: &ViewState, seconds: u64) {
    assert_eq!(
        scenario_clock(view_state).sleeps(),
        vec![Duration::from_secs(seconds)]
    );
}
