// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions implemented by Vigil adapter crates.

pub mod channel;
pub mod store;

pub use channel::ChannelSender;
pub use store::IncidentStore;
