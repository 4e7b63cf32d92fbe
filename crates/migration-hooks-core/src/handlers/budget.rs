//! Execution budget for handler operations
//!
//! With a budget, the operation runs on a worker thread watched by the caller.
//! When the budget elapses the caller stops waiting and reports a timeout. A
//! plain closure cannot be interrupted from outside, so the worker is left to
//! finish in the background; command-backed operations enforce the same
//! deadline themselves and kill their child process.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use super::HandlerFn;

/// Why an operation did not complete successfully
#[derive(Debug, Error)]
pub enum BudgetFailure {
    /// The operation returned an error
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The operation panicked
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The operation was still running when the budget elapsed
    #[error("timeout after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Run `action`, giving up after `budget` if one is set
pub fn run_with_budget(action: &HandlerFn, budget: Option<Duration>) -> Result<(), BudgetFailure> {
    let Some(budget) = budget else {
        return run_inline(action);
    };

    let (tx, rx) = mpsc::channel();
    let worker = action.clone();
    let spawned = thread::Builder::new()
        .name("migration-hook".to_string())
        .spawn(move || {
            let outcome = run_inline(&worker);
            // The receiver is gone once the budget has elapsed.
            let _ = tx.send(outcome);
        });

    if let Err(e) = spawned {
        return Err(BudgetFailure::Failed(anyhow::anyhow!(
            "failed to spawn hook worker: {e}"
        )));
    }

    match rx.recv_timeout(budget) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            warn!(budget_secs = budget.as_secs(), "hook exceeded its execution budget, abandoning it");
            Err(BudgetFailure::TimedOut(budget))
        }
        Err(RecvTimeoutError::Disconnected) => Err(BudgetFailure::Panicked(
            "hook worker exited without reporting".to_string(),
        )),
    }
}

fn run_inline(action: &HandlerFn) -> Result<(), BudgetFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| action())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(BudgetFailure::Failed(e)),
        Err(payload) => Err(BudgetFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
