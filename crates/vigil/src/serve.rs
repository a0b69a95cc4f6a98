// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vigil serve` command implementation.
//!
//! Wires the configured channel senders, SQLite store, compiled alert rules,
//! dispatcher, queue worker, and the HTTP gateway, then serves until a
//! shutdown signal arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vigil_config::model::VigilConfig;
use vigil_core::types::Channel;
use vigil_core::{ChannelSender, VigilError};
use vigil_dispatch::{Dispatcher, run_worker};
use vigil_email::EmailSender;
use vigil_gateway::{AuthConfig, GatewayState, HealthState, ServerOptions, start_server};
use vigil_sms::SmsSender;
use vigil_storage::SqliteStore;
use vigil_webhook::WebhookSender;

/// Build the channel sender registry from configuration.
///
/// Email and SMS are enabled only when configured; a sender that fails to
/// build logs a warning and leaves its channel unregistered (deliveries on
/// it fail and are retried per policy, never panicking the server). The
/// webhook sender needs no configuration and is always registered.
fn build_senders(config: &VigilConfig) -> HashMap<Channel, Arc<dyn ChannelSender>> {
    let mut senders: HashMap<Channel, Arc<dyn ChannelSender>> = HashMap::new();

    if config.email.smtp_host.is_some() {
        match EmailSender::new(&config.email) {
            Ok(sender) => {
                senders.insert(Channel::Email, Arc::new(sender));
            }
            Err(e) => warn!(error = %e, "email channel disabled"),
        }
    }

    if config.sms.account_sid.is_some() {
        match SmsSender::new(&config.sms) {
            Ok(sender) => {
                senders.insert(Channel::Sms, Arc::new(sender));
            }
            Err(e) => warn!(error = %e, "sms channel disabled"),
        }
    }

    senders.insert(Channel::Webhook, Arc::new(WebhookSender::new()));
    senders
}

/// Runs the `vigil serve` command.
pub async fn run_serve(config: VigilConfig) -> Result<(), VigilError> {
    init_tracing(&config.server.log_level);
    info!("starting vigil serve");

    // Storage first: everything else depends on it.
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let senders = build_senders(&config);
    info!(
        channels = ?senders.keys().collect::<Vec<_>>(),
        "channel senders registered"
    );

    let (rules, rule_errors) = vigil_rules::compile_rules(&config.rules);
    for error in &rule_errors {
        // A malformed rule disables only itself.
        warn!(error = %error, "alert rule disabled");
    }
    info!(count = rules.len(), "alert rules compiled");

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        senders,
        config.dispatch.clone(),
    ));

    let cancel = CancellationToken::new();

    let worker = tokio::spawn(run_worker(
        dispatcher.clone(),
        store.clone(),
        Duration::from_millis(config.dispatch.worker_poll_ms),
        Duration::from_secs(config.dispatch.retention_hours * 3600),
        cancel.clone(),
    ));

    if config.server.bearer_token.is_none() {
        warn!("server.bearer_token is not set -- all /v1 requests will be rejected");
    }

    let state = GatewayState {
        store: store.clone(),
        dispatcher,
        rules: Arc::new(rules),
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };

    // Ctrl-C triggers graceful shutdown of the server and worker.
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let options = ServerOptions {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let result = start_server(&options, state, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = worker.await {
        warn!(error = %e, "dispatch worker join failed");
    }
    store.close().await?;
    info!("vigil stopped");

    result
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // try_init: tests may install their own subscriber first.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
