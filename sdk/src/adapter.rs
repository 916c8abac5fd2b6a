//! Platform adapter trait
//!
//! This module defines the contract every platform adapter must implement.
//! The engine's scheduler only ever talks to adapters through this trait;
//! navigation and scraping mechanics stay fully encapsulated behind it.

use crate::errors::EngineError;
use crate::types::{ConnectStatus, HttpSummary, SampleOutcome, SampleUnit, Scope};
use async_trait::async_trait;

/// Default per-run sample cap for a platform when none is configured.
pub const DEFAULT_DAILY_CAP: u32 = 100;

/// Trait that all platform adapters must implement.
///
/// One adapter instance exists per enabled platform per run. Adapters own
/// their connection/session state; the scheduler drives them strictly
/// sequentially, so implementations may use interior mutability without
/// worrying about concurrent callers.
///
/// Contract summary:
/// - `connect` is called at most once per run. Missing credentials are a
///   normal `ok = false` status, never an `Err`. Transient connection
///   failures are retried internally with bounded backoff before the
///   adapter gives up; only then may an `Err` surface, and the scheduler
///   downgrades it to a not-connected status.
/// - The discovery calls never fail: an internal fault yields an empty
///   list (and a log line on the adapter's side).
/// - `fetch_next_task` returns `Ok(None)` when the scope is exhausted,
///   which is an expected terminal condition rather than an error.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Stable name of the platform (e.g. "appen")
    fn name(&self) -> &str;

    /// Per-run sample cap configured for this platform
    fn daily_cap(&self) -> u32 {
        DEFAULT_DAILY_CAP
    }

    /// Establish a session with the platform.
    ///
    /// May persist reusable session state (e.g. a cookie state file) so
    /// future runs skip the login flow. Implementations must release the
    /// underlying session resource on every exit path, including failure.
    async fn connect(&self) -> Result<ConnectStatus, EngineError>;

    /// List currently active projects. Never fails; faults yield `vec![]`.
    async fn list_active_projects(&self) -> Vec<Scope>;

    /// List available qualifications. Never fails; faults yield `vec![]`.
    async fn list_qualifications(&self) -> Vec<Scope>;

    /// Fetch the next task unit from a scope.
    ///
    /// `Ok(None)` means the scope is exhausted. May block briefly to
    /// emulate realistic pacing. An `Err` (e.g. exhausted HTTP retries)
    /// makes the scheduler abandon the current worklist item only.
    async fn fetch_next_task(&self, scope: &Scope) -> Result<Option<SampleUnit>, EngineError>;

    /// Annotate one sample and, unless in assist mode, submit it.
    ///
    /// In assist mode the result is computed but never committed
    /// (`submitted = 0`, still counted as attempted). A platform
    /// rate-limit signal sets `throttled = true` on the outcome; the
    /// scheduler treats that as a backoff directive, not a fault.
    async fn annotate_and_submit(
        &self,
        sample: &SampleUnit,
        task_type: &str,
        assist_mode: bool,
    ) -> Result<SampleOutcome, EngineError>;

    /// HTTP status-class counters for reporting, when the adapter keeps any.
    fn http_summary(&self) -> Option<HttpSummary> {
        None
    }
}
