// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST gateway for the Vigil incident service.
//!
//! A thin axum layer over the lifecycle, rules, storage, and dispatch
//! components: bearer-token auth (fail-closed), input validation, and
//! error-to-status mapping. No business logic lives here.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, HealthState, ServerOptions, build_router, start_server};
