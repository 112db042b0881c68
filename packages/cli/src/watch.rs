//! One geofence check and the periodic watch loop built on it.

use std::path::Path;
use std::time::Duration;

use geowatch_alert::{Notifier, NotifyError, SummarizeError, notify_all, summarize};
use geowatch_evaluate::{evaluate, sort_by_zone_id};
use geowatch_report::{ReportError, latest_sample, load_reports};
use geowatch_zone::{ZoneError, ZoneStore};

/// Errors that can abort a single check.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// No zone snapshot available.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// The report dump could not be read.
    #[error("Failed to read location reports: {0}")]
    Report(#[from] ReportError),

    /// Violations could not be summarized.
    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    /// The alert did not reach every recipient.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The report dump held no reports.
    NoReports,
    /// The latest position violates no zone.
    Clear,
    /// At least one zone is violated; `message` is the alert text.
    Violated {
        /// Number of violated zones.
        violations: usize,
        /// Alert summary.
        message: String,
    },
}

/// Where alerts go.
pub struct AlertTarget<'a> {
    /// Delivery channel; `None` in dry-run mode.
    pub notifier: Option<&'a dyn Notifier>,
    /// Recipients.
    pub recipients: &'a [String],
}

/// Checks the latest report in `reports_path` against the store's current
/// snapshot and alerts on violations.
///
/// # Errors
///
/// Returns [`CheckError`] if no snapshot is loaded, the reports cannot be
/// read, or alert delivery fails.
pub async fn check_latest(
    store: &ZoneStore,
    reports_path: &Path,
    target: &AlertTarget<'_>,
) -> Result<Outcome, CheckError> {
    let snapshot = store.current()?;
    let reports = load_reports(reports_path).await?;

    let Some(sample) = latest_sample(&reports) else {
        log::warn!("No location reports in {}", reports_path.display());
        return Ok(Outcome::NoReports);
    };

    log::info!(
        "Latest report at {} ({},{})",
        sample.timestamp,
        sample.latitude,
        sample.longitude
    );

    let mut violations = evaluate(&snapshot, &sample);
    if violations.is_empty() {
        log::info!("Inside all {} active zones", snapshot.len());
        return Ok(Outcome::Clear);
    }
    sort_by_zone_id(&mut violations);

    let message = summarize(&violations)?;
    log::warn!("{} zone(s) violated: {message}", violations.len());

    match target.notifier {
        Some(notifier) if !target.recipients.is_empty() => {
            notify_all(notifier, target.recipients, &message).await?;
            log::info!("Alert sent to {} recipient(s)", target.recipients.len());
        }
        Some(_) => log::warn!("No recipients configured; alert not sent"),
        None => log::info!("Dry run; alert not sent"),
    }

    Ok(Outcome::Violated {
        violations: violations.len(),
        message,
    })
}

/// Reloads zones and checks the latest report every `interval` until
/// Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns [`ZoneError`] if the initial zone load fails.
pub async fn watch(
    store: &ZoneStore,
    reports_path: &Path,
    target: &AlertTarget<'_>,
    interval: Duration,
) -> Result<(), ZoneError> {
    watch_until(store, reports_path, target, interval, shutdown_signal()).await
}

/// Like [`watch`], but stops when `shutdown` completes.
///
/// The first load must succeed. Later reload failures are logged and the
/// previous snapshot stays in use; failed checks are logged and retried on
/// the next tick. `shutdown` is polled for the whole run, including while a
/// check or reload is in flight.
///
/// # Errors
///
/// Returns [`ZoneError`] if the initial zone load fails.
pub async fn watch_until<S>(
    store: &ZoneStore,
    reports_path: &Path,
    target: &AlertTarget<'_>,
    interval: Duration,
    shutdown: S,
) -> Result<(), ZoneError>
where
    S: Future<Output = ()>,
{
    store.reload().await?;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately and the snapshot is fresh.
    ticker.tick().await;

    let cycle = async {
        loop {
            if let Err(e) = check_latest(store, reports_path, target).await {
                log::error!("Check failed: {e}");
            }

            ticker.tick().await;

            if let Err(e) = store.reload().await {
                log::debug!("Continuing with previous zones after reload error: {e}");
            }
        }
    };

    tokio::pin!(shutdown);
    tokio::select! {
        biased;
        () = &mut shutdown => log::info!("Shutdown requested; stopping watch"),
        () = cycle => {}
    }

    Ok(())
}

/// Completes on Ctrl-C, or SIGTERM on unix. If a handler cannot be
/// installed that signal is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received Ctrl-C"),
        () = terminate => log::info!("Received SIGTERM"),
    }
}
