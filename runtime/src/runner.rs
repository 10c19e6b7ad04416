//! Single-flight wrapper around the dues generator.
//!
//! The daily schedule and the manual trigger share one [`DuesRunner`]. Runs
//! are serialised by an async mutex: a manual run requested while the
//! scheduled one is in progress waits for it, then finds nothing left to
//! bill.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::Mutex;

use pgpal_core::StoreError;

use crate::dues::{DuesGenerator, DuesReport};

/// What started a generator run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The daily timer
    Scheduled,
    /// An operator request
    Manual,
}

impl Trigger {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

/// Serialises dues generation runs.
pub struct DuesRunner {
    generator: Arc<DuesGenerator>,
    gate: Mutex<()>,
}

impl DuesRunner {
    /// Wrap a generator.
    #[must_use]
    pub fn new(generator: Arc<DuesGenerator>) -> Self {
        Self {
            generator,
            gate: Mutex::new(()),
        }
    }

    /// Run the generator once, waiting for any run already in progress.
    ///
    /// # Errors
    ///
    /// Propagates the generator's [`StoreError`].
    pub async fn run(&self, trigger: Trigger) -> Result<DuesReport, StoreError> {
        let _guard = self.gate.lock().await;
        let started = Instant::now();

        tracing::info!(trigger = trigger.as_str(), "Dues run started");
        let result = self.generator.generate().await;

        histogram!("pgpal_dues_run_duration_seconds").record(started.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!("pgpal_dues_runs_total", "trigger" => trigger.as_str(), "outcome" => outcome)
            .increment(1);

        if let Err(err) = &result {
            tracing::error!(trigger = trigger.as_str(), error = %err, "Dues run failed");
        }
        result
    }
}
