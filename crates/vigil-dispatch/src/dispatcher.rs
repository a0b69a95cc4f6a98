// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification dispatcher: turns one notification event into zero or
//! more delivered messages, exactly-once in effect.
//!
//! Delivery is at-least-once: every outcome is recorded in storage before
//! `dispatch` returns, so a crash mid-dispatch leaves the event `pending`
//! and the next pass re-attempts it. The dedupe key collapses duplicate
//! attempts into one logical delivery wherever the channel provider applies
//! its own message-level dedupe (see `ChannelSender` docs for the caveat).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use tracing::{debug, info, warn};

use vigil_config::model::DispatchConfig;
use vigil_core::types::{
    Channel, ChannelOutcome, DeliveryReceipt, DeliveryState, NotificationEvent,
    NotificationMessage,
};
use vigil_core::{ChannelSender, IncidentStore, VigilError};

use crate::backoff::backoff_delay;

/// Dispatches notification events over registered channel senders.
pub struct Dispatcher {
    store: Arc<dyn IncidentStore>,
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
    config: DispatchConfig,
    /// Dedupe keys currently being dispatched by this process. A re-entrant
    /// dispatch for an in-flight key short-circuits instead of double-sending.
    in_flight: DashMap<String, ()>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn IncidentStore>,
        senders: HashMap<Channel, Arc<dyn ChannelSender>>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            senders,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// The channels with a registered sender.
    pub fn configured_channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }

    /// Persist an event as `pending` for the queue worker to pick up.
    ///
    /// Idempotent: an event with a known dedupe key is not re-enqueued.
    /// Returns `true` if the event was newly enqueued.
    pub async fn enqueue(&self, event: &NotificationEvent) -> Result<bool, VigilError> {
        let inserted = self.store.insert_event(event).await?;
        if inserted {
            debug!(dedupe_key = %event.dedupe_key, "notification event enqueued");
        }
        Ok(inserted)
    }

    /// Dispatch one event and record the outcome.
    ///
    /// Safe to call multiple times for the same underlying trigger: an event
    /// already delivered, abandoned, or in flight short-circuits to its
    /// existing receipt. Each channel is attempted independently with
    /// exponential-backoff retries and a bounded per-attempt timeout; any
    /// successful channel counts the event as delivered, and the event is
    /// abandoned only when every channel has failed past max attempts.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<DeliveryReceipt, VigilError> {
        let key = &event.dedupe_key;

        // Idempotent re-entry: terminal or in-flight events return the
        // receipt recorded so far without touching any channel.
        if self.in_flight.contains_key(key) {
            debug!(dedupe_key = %key, "dispatch short-circuit: in flight");
            return self.existing_receipt(key, DeliveryState::Pending).await;
        }
        if let Some((_, state)) = self.store.get_event(key).await?
            && state != DeliveryState::Pending
        {
            debug!(dedupe_key = %key, %state, "dispatch short-circuit: already settled");
            return self.existing_receipt(key, state).await;
        }

        // Ensure the pending row exists before the first send so a crash
        // after a partial send can only duplicate, never lose, the event.
        self.store.insert_event(event).await?;

        let guard = InFlightGuard::insert(&self.in_flight, key.clone());

        let mut outcomes = Vec::with_capacity(event.channels.len());
        let message = NotificationMessage {
            subject: event.subject.clone(),
            body: event.body.clone(),
            dedupe_key: event.dedupe_key.clone(),
        };

        // Channels are independent: one channel's failure never blocks the
        // others from being attempted.
        let attempts = event
            .channels
            .iter()
            .map(|&channel| self.deliver_on_channel(channel, &event.recipients, &message));
        for outcome in futures::future::join_all(attempts).await {
            self.store.record_attempt(key, &outcome).await?;
            outcomes.push(outcome);
        }

        let delivered = outcomes
            .iter()
            .any(|o| o.state == DeliveryState::Delivered);
        let state = if delivered {
            DeliveryState::Delivered
        } else {
            DeliveryState::Abandoned
        };
        self.store.mark_event(key, state).await?;
        drop(guard);

        match state {
            DeliveryState::Delivered => {
                counter!("vigil_dispatch_delivered_total").increment(1);
                info!(dedupe_key = %key, "notification delivered");
            }
            _ => {
                counter!("vigil_dispatch_abandoned_total").increment(1);
                warn!(dedupe_key = %key, "notification abandoned: all channels failed");
            }
        }

        Ok(DeliveryReceipt {
            dedupe_key: key.clone(),
            state,
            channels: outcomes,
        })
    }

    /// Attempt delivery on one channel with retries.
    ///
    /// Sends to every recipient; an attempt succeeds only when all
    /// recipients accepted. Retries re-send to all recipients, so a
    /// recipient that already accepted may see a duplicate (at-least-once).
    async fn deliver_on_channel(
        &self,
        channel: Channel,
        recipients: &[String],
        message: &NotificationMessage,
    ) -> ChannelOutcome {
        let Some(sender) = self.senders.get(&channel) else {
            warn!(%channel, "no sender registered for channel");
            return ChannelOutcome {
                channel,
                state: DeliveryState::Failed,
                attempts: 0,
                error: Some("no sender registered".to_string()),
            };
        };

        let timeout = std::time::Duration::from_secs(self.config.send_timeout_secs);
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff_delay(self.config.base_delay_ms, attempt - 1)).await;
            }
            counter!("vigil_dispatch_attempts_total", "channel" => channel.to_string())
                .increment(1);

            match self
                .send_to_all(sender.as_ref(), recipients, message, timeout)
                .await
            {
                Ok(()) => {
                    return ChannelOutcome {
                        channel,
                        state: DeliveryState::Delivered,
                        attempts: attempt,
                        error: None,
                    };
                }
                Err(e) => {
                    debug!(%channel, attempt, error = %e, "delivery attempt failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        counter!("vigil_dispatch_channel_failed_total", "channel" => channel.to_string())
            .increment(1);
        ChannelOutcome {
            channel,
            state: DeliveryState::Failed,
            attempts: self.config.max_attempts,
            error: last_error,
        }
    }

    async fn send_to_all(
        &self,
        sender: &dyn ChannelSender,
        recipients: &[String],
        message: &NotificationMessage,
        timeout: std::time::Duration,
    ) -> Result<(), VigilError> {
        for recipient in recipients {
            tokio::time::timeout(timeout, sender.send(recipient, message))
                .await
                .map_err(|_| VigilError::Timeout { duration: timeout })??;
        }
        Ok(())
    }

    /// Rebuild a receipt for an event from its recorded attempts.
    async fn existing_receipt(
        &self,
        dedupe_key: &str,
        state: DeliveryState,
    ) -> Result<DeliveryReceipt, VigilError> {
        let channels = self.store.list_attempts(dedupe_key).await?;
        Ok(DeliveryReceipt {
            dedupe_key: dedupe_key.to_string(),
            state,
            channels,
        })
    }
}

/// Removes the dedupe key from the in-flight set on drop, so a cancelled
/// dispatch does not wedge the key forever.
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn insert(map: &'a DashMap<String, ()>, key: String) -> Self {
        map.insert(key.clone(), ());
        Self { map, key }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
