//! Runtime and mock GitLab server shared by the steps of one scenario.
//!
//! Step functions are synchronous, so every async call goes through
//! [`SharedRuntime::block_on`]. The server lives in its own slot and is
//! started lazily on the shared runtime the first time a step needs it.

use std::future::Future;
use std::io;
use std::rc::Rc;

use rstest_bdd::Slot;
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// Cloneable handle to the scenario's Tokio runtime.
#[derive(Clone)]
pub struct SharedRuntime(Rc<Runtime>);

impl SharedRuntime {
    /// Starts a fresh runtime.
    pub fn start() -> io::Result<Self> {
        Ok(Self(Rc::new(Runtime::new()?)))
    }

    /// Drives `future` to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.0.block_on(future)
    }

    /// Registers `mocks` on the scenario's GitLab server.
    ///
    /// # Errors
    ///
    /// Returns an error when the server has not been started.
    pub fn mount(&self, server: &Slot<MockServer>, mocks: Vec<Mock>) -> io::Result<()> {
        server
            .with_ref(|server| {
                self.block_on(async {
                    for mock in mocks {
                        mock.mount(server).await;
                    }
                });
            })
            .ok_or_else(|| io::Error::other("mock GitLab server not started"))
    }
}

/// Returns the scenario runtime, starting it and the mock GitLab server on
/// first use.
///
/// # Errors
///
/// Returns an error when the runtime cannot be built or the slot loses it.
pub fn scenario_runtime(
    runtime: &Slot<SharedRuntime>,
    server: &Slot<MockServer>,
) -> io::Result<SharedRuntime> {
    if runtime.with_ref(|_| ()).is_none() {
        runtime.set(SharedRuntime::start()?);
    }
    let shared = runtime
        .get()
        .ok_or_else(|| io::Error::other("scenario runtime missing after start"))?;

    if server.with_ref(|_| ()).is_none() {
        server.set(shared.block_on(MockServer::start()));
    }
    Ok(shared)
}
