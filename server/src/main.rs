//! PG-Pal rent engine HTTP server.
//!
//! Wires the Postgres store, the tenancy lifecycle and the recurring dues
//! generator behind the HTTP API, and runs the daily dues job.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use config::Config;
use pgpal_core::calendar::BillingCalendar;
use pgpal_core::environment::{Clock, SystemClock};
use pgpal_core::notification::ReminderChannel;
use pgpal_postgres::PostgresStore;
use pgpal_runtime::metrics::MetricsServer;
use pgpal_runtime::sms::{LogOnlyChannel, TwilioSmsChannel};
use pgpal_runtime::{DailySchedule, DuesGenerator, DuesRunner, Scheduler, TenancyLifecycle, Trigger};
use pgpal_web::{AppState, router};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("Failed to read .env");
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgpal=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PG-Pal server");

    let config = Config::from_env();
    info!(
        database_url = %redact(&config.postgres.url),
        sms = config.sms.is_some(),
        dues_run_at = %config.billing.run_at,
        "Configuration loaded"
    );

    let metrics_addr: SocketAddr = format!("{}:{}", config.server.metrics_host, config.server.metrics_port)
        .parse()
        .context("Invalid metrics address")?;
    MetricsServer::new(metrics_addr).start()?;

    let calendar = BillingCalendar::from_utc_offset_minutes(config.billing.utc_offset_minutes)
        .with_context(|| {
            format!(
                "BILLING_UTC_OFFSET_MINUTES out of range: {}",
                config.billing.utc_offset_minutes
            )
        })?;
    let schedule = DailySchedule::parse(&config.billing.run_at, calendar.offset())?;

    info!("Connecting to database...");
    let store = PostgresStore::connect(&config.postgres.url, &config.postgres.pool()).await?;
    store.migrate().await?;
    info!("Database ready");

    let channel: Arc<dyn ReminderChannel> = match config.sms.clone() {
        Some(twilio) => {
            info!(from = %twilio.from_number, "Sending reminders through Twilio");
            Arc::new(TwilioSmsChannel::new(twilio))
        },
        None => {
            warn!("Twilio not configured; reminders will only be logged");
            Arc::new(LogOnlyChannel)
        },
    };

    let store = Arc::new(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let lifecycle = TenancyLifecycle::new(store.clone(), clock.clone(), calendar);
    let generator = DuesGenerator::new(
        store,
        clock.clone(),
        calendar,
        channel,
        config.billing.reminder_brand.clone(),
    );
    let runner = Arc::new(DuesRunner::new(Arc::new(generator)));

    let scheduler = if config.billing.scheduler_enabled {
        let scheduled = runner.clone();
        info!(at = %schedule.at(), "Daily dues job scheduled");
        Some(Scheduler::start(schedule, clock, move || {
            let runner = scheduled.clone();
            async move { runner.run(Trigger::Scheduled).await }
        }))
    } else {
        info!("Daily dues job disabled");
        None
    };

    let app = router(AppState::new(lifecycle, runner));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        let timeout = Duration::from_secs(config.server.shutdown_timeout);
        if tokio::time::timeout(timeout, scheduler.shutdown()).await.is_err() {
            warn!(?timeout, "Dues job still running at shutdown; abandoning it");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Strip the password from a database URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let credentials = &url[scheme + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{user}:***{}", &url[..scheme + 3], &url[at..]),
                None => url.to_string(),
            }
        },
        _ => url.to_string(),
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redact_hides_the_password() {
        assert_eq!(
            redact("postgres://postgres:hunter2@db:5432/pgpal"),
            "postgres://postgres:***@db:5432/pgpal"
        );
    }

    #[test]
    fn redact_leaves_urls_without_credentials() {
        assert_eq!(redact("postgres://db/pgpal"), "postgres://db/pgpal");
        assert_eq!(redact("postgres://user@db/pgpal"), "postgres://user@db/pgpal");
    }
}
