// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification dispatch for the Vigil incident service.
//!
//! [`Dispatcher`] implements at-least-once delivery with dedupe-key
//! idempotency, independent per-channel retries with exponential backoff and
//! bounded timeouts, and a partial-success policy (any delivered channel
//! settles the event as delivered). [`run_worker`] drains the persistent
//! queue for burst absorption and crash recovery.

pub mod backoff;
pub mod dispatcher;
pub mod worker;

pub use backoff::backoff_delay;
pub use dispatcher::Dispatcher;
pub use worker::run_worker;
