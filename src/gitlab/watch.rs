//! Fixed-cadence refresh of one merge request view with change detection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::clock::{Clock, system_clock};
use super::error::GitLabError;
use super::locator::Fingerprint;
use super::models::NormalizedView;
use super::views::{MergeRequestViews, ViewOptions};

/// Polls a view with `force_refresh` and reports changes of `updated_at`.
#[derive(Clone)]
pub struct ViewWatcher {
    clock: Arc<dyn Clock>,
}

impl Default for ViewWatcher {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl fmt::Debug for ViewWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewWatcher").finish_non_exhaustive()
    }
}

impl ViewWatcher {
    /// Creates a watcher that paces its ticks with `clock`.
    #[must_use]
    pub const fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Starts polling on the current Tokio runtime.
    ///
    /// The first tick fires immediately and only records the baseline.
    /// Later ticks call `on_change` when `updated_at` differs from the last
    /// observed value. Fetch errors go to `on_error` and polling continues.
    #[must_use]
    pub fn spawn<C, E>(
        &self,
        views: MergeRequestViews,
        fingerprint: Fingerprint,
        interval: Duration,
        mut on_change: C,
        mut on_error: E,
    ) -> WatchHandle
    where
        C: FnMut(&NormalizedView) + Send + 'static,
        E: FnMut(&GitLabError) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = interval.max(Duration::from_millis(1));
        let clock = Arc::clone(&self.clock);

        let task = tokio::spawn(async move {
            let mut baseline: Option<DateTime<Utc>> = None;

            loop {
                if *stop_rx.borrow_and_update() {
                    break;
                }
                // Ticks keep a fixed cadence; fetch time is not added to it.
                let next_tick = clock.now() + period;

                match views.get_view(&fingerprint, ViewOptions::refresh()).await {
                    Ok(view) => {
                        let previous = baseline.replace(view.updated_at);
                        if previous.is_some_and(|seen| seen != view.updated_at) {
                            tracing::info!(
                                key = %fingerprint,
                                updated_at = %view.updated_at,
                                "merge request changed"
                            );
                            on_change(&view);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            key = %fingerprint,
                            kind = %error.kind,
                            error = %error,
                            "watch refresh failed"
                        );
                        on_error(&error);
                    }
                }

                let wait = next_tick.saturating_duration_since(clock.now());
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    () = clock.sleep(wait) => {}
                }
            }
            tracing::debug!(key = %fingerprint, "watcher stopped");
        });

        WatchHandle {
            stop_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running [`ViewWatcher`]. Dropping it stops the watcher.
#[derive(Debug)]
pub struct WatchHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Prevents further ticks. A fetch already in flight still completes.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Stops the watcher and waits for its task to finish.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(error = %error, "watcher task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
