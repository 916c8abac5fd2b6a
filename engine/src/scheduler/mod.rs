//! Scheduling and orchestration
//!
//! The orchestrator is the engine's core control loop. One run moves
//! through the states Init → Connecting → Discovering → Planning →
//! Executing → Finalizing → Done, never backwards; a hard failure in any
//! state jumps straight to Finalizing, so every run produces a summary
//! artifact and the process exits 0.
//!
//! Worklist items execute strictly sequentially: adapters hold stateful,
//! non-shareable sessions, and the pacing/throttle semantics are defined
//! relative to a single ongoing interaction stream. The only suspension
//! points are the pacing delay before each unit of work and the fixed
//! cooldown after a throttle signal. The run deadline is passed explicitly
//! down the call chain rather than held as ambient state, so the loop is
//! testable under an injected (paused) clock.

use crate::config::Config;
use crate::strategy::{self, DiscoveredScope, WorkItem};
use crate::summary::{AnnotationAction, RunSummary};
use sdk::adapter::PlatformAdapter;
use sdk::errors::EngineError;
use sdk::types::ConnectStatus;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Fixed cooldown applied after a platform throttle signal.
///
/// An intra-item penalty: the same worklist item continues once the
/// cooldown elapses, and later attempts still count toward its budget.
pub const THROTTLE_COOLDOWN: Duration = Duration::from_secs(60);

/// The run orchestrator.
///
/// Owns the adapter list and the run summary for the run's lifetime.
pub struct Orchestrator {
    config: Config,
    adapters: Vec<Box<dyn PlatformAdapter>>,
}

impl Orchestrator {
    /// Create an orchestrator over an already-built adapter list.
    ///
    /// Adapters for disabled platforms are never instantiated; the
    /// caller passes only the enabled ones.
    pub fn new(config: Config, adapters: Vec<Box<dyn PlatformAdapter>>) -> Self {
        Self { config, adapters }
    }

    /// Execute one full daily run and write the summary artifact.
    ///
    /// Never fails for any reachable state-machine outcome: connect and
    /// discovery faults are downgraded to reasoning entries, per-item
    /// faults abandon only their item. The returned error can only come
    /// from writing the artifact itself.
    pub async fn run_daily(&self) -> Result<PathBuf, EngineError> {
        let mut summary = RunSummary::new();

        // Init: compute the run deadline before anything else happens.
        let deadline = Instant::now() + daily_budget(self.config.runtime.max_daily_hours);
        summary.add_reasoning("Loaded configuration and initialized session.");

        // Connecting
        let connected = self.connect_all(&mut summary).await;
        if connected.is_empty() {
            // Normal termination, not a fault: artifact is still written.
            summary.add_reasoning("No platforms connected; stopping.");
            return self.finalize(summary);
        }

        // Discovering
        let (projects, quals) = self.discover(&connected, &mut summary).await;

        // Planning
        let worklist = strategy::select(&projects, &quals, &self.config.strategy);
        info!("Planned {} worklist item(s)", worklist.len());

        // Executing
        self.execute(&worklist, deadline, &mut summary).await;

        // Finalizing
        self.finalize(summary)
    }

    /// Connecting state: call `connect()` on every adapter.
    ///
    /// Every outcome, success or failure, appends exactly one reasoning
    /// entry. A raised adapter fault is downgraded to a failed status.
    async fn connect_all(&self, summary: &mut RunSummary) -> Vec<usize> {
        let mut connected = Vec::new();

        for (index, adapter) in self.adapters.iter().enumerate() {
            let status = match adapter.connect().await {
                Ok(status) => status,
                Err(e) => ConnectStatus::failed(format!("Error connecting: {}", e)),
            };

            summary.add_reasoning(format!("{}: {}", adapter.name(), status.message));
            if status.ok {
                info!("{}: connected", adapter.name());
                connected.push(index);
            } else {
                warn!("{}: not connected: {}", adapter.name(), status.message);
            }
        }

        connected
    }

    /// Discovering state: list projects and qualifications per adapter.
    ///
    /// Adapters never raise from discovery (faults yield empty lists), so
    /// one failing adapter cannot block the others' discovery.
    async fn discover(
        &self,
        connected: &[usize],
        summary: &mut RunSummary,
    ) -> (Vec<DiscoveredScope>, Vec<DiscoveredScope>) {
        let mut projects = Vec::new();
        let mut quals = Vec::new();

        for &index in connected {
            let adapter = &self.adapters[index];
            let found_projects = adapter.list_active_projects().await;
            let found_quals = adapter.list_qualifications().await;

            summary.add_reasoning(format!(
                "{}: Found {} active projects, {} qualifications.",
                adapter.name(),
                found_projects.len(),
                found_quals.len()
            ));

            let daily_cap = adapter.daily_cap();
            projects.extend(found_projects.into_iter().map(|scope| DiscoveredScope {
                adapter: index,
                daily_cap,
                scope,
            }));
            quals.extend(found_quals.into_iter().map(|scope| DiscoveredScope {
                adapter: index,
                daily_cap,
                scope,
            }));
        }

        (projects, quals)
    }

    /// Executing state: process the worklist strictly in order.
    async fn execute(&self, worklist: &[WorkItem], deadline: Instant, summary: &mut RunSummary) {
        for item in worklist {
            if Instant::now() >= deadline {
                // Remaining items are simply never started.
                summary.add_reasoning("Reached daily runtime budget; stopping.");
                break;
            }

            self.execute_item(item, deadline, summary).await;
        }
    }

    /// Run one worklist item to completion, exhaustion, or cutoff.
    async fn execute_item(&self, item: &WorkItem, deadline: Instant, summary: &mut RunSummary) {
        let adapter = &self.adapters[item.adapter];
        let mut attempted_total: u32 = 0;
        let mut submitted_total: u32 = 0;

        summary.add_reasoning(format!(
            "Working on {} -> {} [{}] with budget {}.",
            adapter.name(),
            item.scope.name,
            item.task_type,
            item.budget
        ));

        while attempted_total < item.budget && Instant::now() < deadline {
            self.human_delay().await;

            if self.config.runtime.dry_run {
                // Dry run never contacts the adapter and never breaks
                // early on scope exhaustion.
                summary.add_reasoning(format!(
                    "Dry run: would fetch/annotate next sample for {}.",
                    item.scope.name
                ));
                attempted_total += 1;
                continue;
            }

            let sample = match adapter.fetch_next_task(&item.scope).await {
                Ok(Some(sample)) => sample,
                Ok(None) => {
                    // Scope exhausted: expected terminal condition.
                    summary.add_reasoning(format!(
                        "{}: No more tasks in {}.",
                        adapter.name(),
                        item.scope.name
                    ));
                    break;
                }
                Err(e) => {
                    warn!("{}: fetch failed in {}: {}", adapter.name(), item.scope.name, e);
                    summary.add_reasoning(format!(
                        "{}: fetch error in {}: {}; abandoning item.",
                        adapter.name(),
                        item.scope.name,
                        e
                    ));
                    break;
                }
            };

            match adapter
                .annotate_and_submit(&sample, &item.task_type, self.config.runtime.assist_mode)
                .await
            {
                Ok(outcome) => {
                    attempted_total += outcome.attempted.max(1);
                    submitted_total += outcome.submitted;

                    if outcome.throttled {
                        summary
                            .add_reasoning(format!("{}: Throttled; backing off.", adapter.name()));
                        sleep(THROTTLE_COOLDOWN).await;
                    }
                }
                Err(e) => {
                    warn!(
                        "{}: annotation failed in {}: {}",
                        adapter.name(),
                        item.scope.name,
                        e
                    );
                    summary.add_reasoning(format!(
                        "{}: annotation error in {}: {}; abandoning item.",
                        adapter.name(),
                        item.scope.name,
                        e
                    ));
                    break;
                }
            }
        }

        let notes = if self.config.runtime.assist_mode {
            "assist mode (no auto-submit)"
        } else {
            "auto mode"
        };
        summary.add_action(AnnotationAction {
            project: item.scope.name.clone(),
            task_type: item.task_type.clone(),
            samples_annotated: submitted_total,
            attempted: attempted_total,
            notes: notes.to_string(),
        });
        summary.add_reasoning(format!(
            "Completed loop for {} with attempts={}, submitted={}.",
            item.scope.name, attempted_total, submitted_total
        ));
    }

    /// Finalizing state: close the summary and write the artifact.
    ///
    /// Unconditional: reached from every other state however it was
    /// entered (normal completion, zero-adapter termination, or deadline
    /// cutoff).
    fn finalize(&self, mut summary: RunSummary) -> Result<PathBuf, EngineError> {
        for adapter in &self.adapters {
            if let Some(http) = adapter.http_summary() {
                if http.total() > 0 {
                    summary.add_reasoning(format!(
                        "{}: HTTP responses 2xx={} 4xx={} 5xx={}.",
                        adapter.name(),
                        http.count_2xx,
                        http.count_4xx,
                        http.count_5xx
                    ));
                }
            }
        }

        summary.set_summary("Completed daily run.");
        summary.write_daily(&self.config.logging.export_daily_json)
    }

    /// Pacing delay: uniform random wait within the configured bounds,
    /// applied before each unit of work to avoid a request-burst
    /// signature.
    async fn human_delay(&self) {
        let [lo, hi] = self.config.runtime.human_delay_ms;
        let wait_ms = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        debug!("Pacing delay: {}ms", wait_ms);
        sleep(Duration::from_millis(wait_ms)).await;
    }
}

/// Convert the configured daily hour budget into a duration.
fn daily_budget(max_daily_hours: f64) -> Duration {
    Duration::from_secs_f64(max_daily_hours * 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_budget_conversion() {
        assert_eq!(daily_budget(1.0), Duration::from_secs(3600));
        assert_eq!(daily_budget(0.5), Duration::from_secs(1800));
        assert_eq!(daily_budget(2.25), Duration::from_secs(8100));
    }

    #[test]
    fn test_throttle_cooldown_is_a_minute() {
        assert_eq!(THROTTLE_COOLDOWN, Duration::from_secs(60));
    }
}
