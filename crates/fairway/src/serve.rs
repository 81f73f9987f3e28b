// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fairway serve` command implementation.
//!
//! Wires the club executor, e-mail notifier, lifecycle controller, and
//! scheduler over the shared request store, then polls until SIGINT or
//! SIGTERM. All scheduling state lives in the store, so a restart resumes
//! exactly where the previous process left off.

use std::sync::Arc;
use std::time::Duration;

use fairway_club::ClubExecutor;
use fairway_config::model::NotificationsConfig;
use fairway_config::FairwayConfig;
use fairway_core::FairwayError;
use fairway_engine::{BackoffPolicy, LifecycleController, Scheduler};
use fairway_notify::{EmailNotifier, EmailSettings};
use fairway_store::BookingStore;
use tracing::{info, warn};

use crate::shutdown;

fn email_settings(config: &NotificationsConfig) -> Option<EmailSettings> {
    match (
        &config.smtp_host,
        &config.smtp_username,
        &config.smtp_password,
        &config.from_address,
        &config.alert_address,
    ) {
        (Some(host), Some(user), Some(pass), Some(from), Some(to)) => Some(EmailSettings {
            smtp_host: host.clone(),
            smtp_username: user.clone(),
            smtp_password: pass.clone(),
            from: from.clone(),
            to: to.clone(),
        }),
        _ => {
            if config.is_configured() {
                warn!("notifications partially configured, missing SMTP credentials; disabled");
            }
            None
        }
    }
}

/// Run the `fairway serve` command.
pub async fn run_serve(config: FairwayConfig) -> Result<(), FairwayError> {
    init_tracing(&config.daemon.log_level);

    info!("starting fairway serve");

    if let Err(errors) = fairway_config::validate_for_serve(&config) {
        fairway_config::render_errors(&errors);
        return Err(FairwayError::Config(
            "configuration is incomplete for serve".to_string(),
        ));
    }

    let store = BookingStore::open(&config.storage.database_path).await?;
    info!(path = config.storage.database_path.as_str(), "request store opened");

    let base_url = config
        .club
        .base_url
        .clone()
        .ok_or_else(|| FairwayError::Config("club.base_url is required".to_string()))?;
    let username = config
        .club
        .username
        .clone()
        .ok_or_else(|| FairwayError::Config("club.username is required".to_string()))?;
    let password = config
        .club
        .password
        .clone()
        .ok_or_else(|| FairwayError::Config("club.password is required".to_string()))?;
    let executor = Arc::new(ClubExecutor::new(base_url, username, password));

    let settings = email_settings(&config.notifications);
    if settings.is_none() {
        info!("e-mail notifications disabled");
    }
    let notifier = Arc::new(EmailNotifier::new(settings)?);

    let backoff = BackoffPolicy::new(
        config.retry.max_attempts,
        Duration::from_secs(config.retry.base_delay_secs),
        Duration::from_secs(config.retry.max_delay_secs),
    );
    info!(
        max_attempts = config.retry.max_attempts,
        base_delay_secs = config.retry.base_delay_secs,
        max_delay_secs = config.retry.max_delay_secs,
        "retry policy configured"
    );

    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        executor,
        notifier,
        backoff,
        Duration::from_secs(config.scheduler.attempt_timeout_secs),
    ));

    let scheduler = Scheduler::new(
        store,
        controller,
        Duration::from_secs(config.scheduler.poll_interval_secs),
    );

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    scheduler.run(cancel).await?;

    info!("fairway serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fairway={log_level},fairway_store={log_level},fairway_engine={log_level},\
             fairway_club={log_level},fairway_notify={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
