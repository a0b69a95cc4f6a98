// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker: drains pending notification events from storage.
//!
//! Handlers enqueue events and return immediately; this loop absorbs bursts
//! and resumes events left `pending` by a crash or cancelled dispatch. It
//! also prunes settled events past the dedupe retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use vigil_core::IncidentStore;

use crate::dispatcher::Dispatcher;

/// Interval between retention prune passes.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the dispatch worker until the token is cancelled.
///
/// Polls for claimable pending events, dispatching each inline so one
/// worker never dispatches the same event twice concurrently. Dispatch
/// errors are logged and do not stop the loop; the event stays `pending`
/// and is retried once its claim expires.
pub async fn run_worker(
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn IncidentStore>,
    poll_interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) {
    info!("dispatch worker started");
    let mut last_prune = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("dispatch worker stopping");
                break;
            }
            next = store.next_pending_event() => {
                match next {
                    Ok(Some(event)) => {
                        debug!(dedupe_key = %event.dedupe_key, "worker claimed event");
                        if let Err(e) = dispatcher.dispatch(&event).await {
                            error!(dedupe_key = %event.dedupe_key, error = %e,
                                   "dispatch failed; event stays pending");
                        }
                        // Keep draining without sleeping while work remains.
                        continue;
                    }
                    Ok(None) => {
                        if last_prune.elapsed() >= PRUNE_INTERVAL {
                            prune(store.as_ref(), retention).await;
                            last_prune = tokio::time::Instant::now();
                        }
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                info!("dispatch worker stopping");
                                break;
                            }
                            _ = tokio::time::sleep(poll_interval) => {}
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "queue poll failed");
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
        }
    }
}

async fn prune(store: &dyn IncidentStore, retention: Duration) {
    let cutoff = chrono::Utc::now()
        - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(24));
    match store.prune_events(&cutoff.to_rfc3339()).await {
        Ok(0) => {}
        Ok(n) => debug!(pruned = n, "retention prune removed settled events"),
        Err(e) => error!(error = %e, "retention prune failed"),
    }
}
