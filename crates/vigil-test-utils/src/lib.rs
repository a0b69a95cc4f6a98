// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Vigil integration tests.
//!
//! Provides [`MockSender`] (a scriptable `ChannelSender`) and
//! [`TestHarness`] (a fully wired service core over a temp database).

pub mod harness;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::{MockBehavior, MockSender};
