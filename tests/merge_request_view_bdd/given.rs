//! Given steps for merge request view behavioural tests.

use rstest_bdd_macros::given;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use crate::merge_request_view_bdd_state::{ViewState, shared_runtime};
use crate::support::gitlab_fixtures::{graphql_body, graphql_merge_request, rest_merge_request};

const GRAPHQL_PATH: &str = "/api/graphql";

fn mount(view_state: &ViewState, mocks: Vec<Mock>) {
    shared_runtime(view_state)
        .mount(&view_state.server, mocks)
        .unwrap_or_else(|error| panic!("failed to mount mocks: {error}"));
}

#[given("a view TTL of {ttl:u64} seconds")]
fn view_ttl(view_state: &ViewState, ttl: u64) {
    view_state.view_ttl_seconds.set(ttl);
}

#[given("a GitLab server serving merge request {iid:u64} titled {title}")]
fn server_serving_view(view_state: &ViewState, iid: u64, title: String) {
    let iid_text = iid.to_string();
    let body = graphql_body(graphql_merge_request(
        &iid_text,
        title.trim_matches('"'),
        "2024-05-02T10:00:00Z",
    ));

    let view_mock = Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({ "variables": { "iid": iid_text } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .named("GraphQL merge request view");

    mount(view_state, vec![view_mock]);
}

#[given("a GitLab server whose GraphQL API rejects the view query")]
fn server_rejecting_graphql(view_state: &ViewState) {
    let rejection = Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Field 'approvalsLeft' doesn't exist on type 'MergeRequest'" }]
        })))
        .named("GraphQL schema rejection");

    mount(view_state, vec![rejection]);
}

#[given("the REST API serves merge request {iid:u64} titled {title}")]
fn rest_serving_view(view_state: &ViewState, iid: u64, title: String) {
    let rest_mock = Mock::given(method("GET"))
        .and(path_regex(format!(
            r"^/api/v4/projects/[^/]+/merge_requests/{iid}$"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(rest_merge_request(title.trim_matches('"'))),
        )
        .named("REST merge request view");

    mount(view_state, vec![rest_mock]);
}

#[given("a GitLab server without merge request {iid:u64}")]
fn server_without_merge_request(view_state: &ViewState, iid: u64) {
    let missing = Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "variables": { "iid": iid.to_string() } }),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "project": { "mergeRequest": null } } })),
        )
        .named("GraphQL missing merge request");

    mount(view_state, vec![missing]);
}

#[given("a GitLab server that rate limits the first request for {seconds:u64} seconds")]
fn server_rate_limiting_once(view_state: &ViewState, seconds: u64) {
    let limited = Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", seconds.to_string()))
        .up_to_n_times(1)
        .with_priority(1)
        .named("GraphQL rate limit");

    mount(view_state, vec![limited]);
}
