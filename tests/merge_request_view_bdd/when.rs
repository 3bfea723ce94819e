//! When steps for merge request view behavioural tests.

use std::time::Duration;

use mergelens::gitlab::ViewOptions;
use rstest_bdd_macros::when;

use crate::merge_request_view_bdd_state::{
    ViewState, fingerprint, scenario_clock, scenario_views, shared_runtime,
};

fn load(view_state: &ViewState, iid: u64, options: ViewOptions) {
    let runtime = shared_runtime(view_state);
    let views = scenario_views(view_state);
    let key = fingerprint(iid);

    match runtime.block_on(views.get_view(&key, options)) {
        Ok(view) => {
            let _had_previous_error = view_state.error.take().is_some();
            view_state.view.set(view);
        }
        Err(error) => {
            let _had_previous_view = view_state.view.take().is_some();
            view_state.error.set(error);
        }
    }
}

#[when("the view for merge request {iid:u64} is loaded")]
fn load_view(view_state: &ViewState, iid: u64) {
    load(view_state, iid, ViewOptions::default());
}

#[when("the view for merge request {iid:u64} is force refreshed")]
fn refresh_view(view_state: &ViewState, iid: u64) {
    load(view_state, iid, ViewOptions::refresh());
}

#[when("{seconds:u64} seconds pass")]
fn time_passes(view_state: &ViewState, seconds: u64) {
    scenario_clock(view_state).advance(Duration::from_secs(seconds));
}
