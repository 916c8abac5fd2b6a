//! Integration tests for the scheduler/orchestrator
//!
//! Drives the full daily state machine against scripted mock adapters
//! under a paused tokio clock, so pacing delays, throttle cooldowns, and
//! the run deadline all advance deterministically.

use async_trait::async_trait;
use gleaner_engine::config::Config;
use gleaner_engine::scheduler::{Orchestrator, THROTTLE_COOLDOWN};
use sdk::adapter::PlatformAdapter;
use sdk::errors::EngineError;
use sdk::types::{ConnectStatus, SampleOutcome, SampleUnit, Scope};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time::Instant;

/// Scripted adapter: every behavior is configured up front, every call
/// is counted, and annotate timestamps are recorded for ordering checks.
struct MockAdapter {
    name: &'static str,
    cap: u32,
    connect_outcome: Result<ConnectStatus, EngineError>,
    projects: Vec<Scope>,
    quals: Vec<Scope>,
    /// Tasks available per scope name; scopes not listed are bottomless
    tasks_remaining: Mutex<HashMap<String, u32>>,
    /// Annotate call indices (1-based) that report a throttle signal
    throttle_on_calls: Vec<u32>,
    /// Fail every annotate call with a retries-exhausted fault
    annotate_fails: bool,
    fetch_calls: AtomicU32,
    annotate_calls: AtomicU32,
    /// Shared so tests can inspect call times after the adapter is boxed
    annotate_times: Arc<Mutex<Vec<Instant>>>,
}

impl MockAdapter {
    fn connected(name: &'static str) -> Self {
        Self {
            name,
            cap: 100,
            connect_outcome: Ok(ConnectStatus::connected("Connected and session established.")),
            projects: Vec::new(),
            quals: Vec::new(),
            tasks_remaining: Mutex::new(HashMap::new()),
            throttle_on_calls: Vec::new(),
            annotate_fails: false,
            fetch_calls: AtomicU32::new(0),
            annotate_calls: AtomicU32::new(0),
            annotate_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn annotate_times_handle(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.annotate_times)
    }

    fn with_projects(mut self, names: &[&str]) -> Self {
        self.projects = names.iter().map(|n| Scope::from_name(*n)).collect();
        self
    }

    fn with_quals(mut self, names: &[&str]) -> Self {
        self.quals = names.iter().map(|n| Scope::from_name(*n)).collect();
        self
    }

    fn with_cap(mut self, cap: u32) -> Self {
        self.cap = cap;
        self
    }

    fn with_task_limit(self, scope_name: &str, remaining: u32) -> Self {
        self.tasks_remaining
            .lock()
            .unwrap()
            .insert(scope_name.to_string(), remaining);
        self
    }

    fn with_throttle_on(mut self, calls: &[u32]) -> Self {
        self.throttle_on_calls = calls.to_vec();
        self
    }

    fn failing_connect(name: &'static str, message: &str) -> Self {
        let mut adapter = Self::connected(name);
        adapter.connect_outcome = Err(EngineError::RetriesExhausted {
            attempts: 3,
            last: message.to_string(),
        });
        adapter
    }

    fn with_failing_annotate(mut self) -> Self {
        self.annotate_fails = true;
        self
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn daily_cap(&self) -> u32 {
        self.cap
    }

    async fn connect(&self) -> Result<ConnectStatus, EngineError> {
        match &self.connect_outcome {
            Ok(status) => Ok(status.clone()),
            Err(e) => Err(EngineError::RetriesExhausted {
                attempts: 3,
                last: e.to_string(),
            }),
        }
    }

    async fn list_active_projects(&self) -> Vec<Scope> {
        self.projects.clone()
    }

    async fn list_qualifications(&self) -> Vec<Scope> {
        self.quals.clone()
    }

    async fn fetch_next_task(&self, scope: &Scope) -> Result<Option<SampleUnit>, EngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut remaining = self.tasks_remaining.lock().unwrap();
        if let Some(count) = remaining.get_mut(&scope.name) {
            if *count == 0 {
                return Ok(None);
            }
            *count -= 1;
        }

        Ok(Some(SampleUnit {
            id: "task-1".to_string(),
            content: "text snippet".to_string(),
            project: scope.name.clone(),
        }))
    }

    async fn annotate_and_submit(
        &self,
        _sample: &SampleUnit,
        _task_type: &str,
        assist_mode: bool,
    ) -> Result<SampleOutcome, EngineError> {
        let call = self.annotate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.annotate_times.lock().unwrap().push(Instant::now());

        if self.annotate_fails {
            return Err(EngineError::RetriesExhausted {
                attempts: 3,
                last: "HTTP 500: server error".to_string(),
            });
        }

        let outcome = if assist_mode {
            SampleOutcome::attempted_only("assist mode pre-filled")
        } else {
            SampleOutcome::submitted_one("auto-submitted")
        };

        Ok(outcome.with_throttled(self.throttle_on_calls.contains(&call)))
    }
}

fn test_config(out_dir: &Path, hours: f64) -> Config {
    let mut config = Config::default();
    config.runtime.max_daily_hours = hours;
    config.runtime.human_delay_ms = [5, 10];
    config.logging.export_daily_json = out_dir.to_path_buf();
    config
}

async fn run_and_read(orchestrator: &Orchestrator) -> serde_json::Value {
    let path = orchestrator.run_daily().await.expect("run writes artifact");
    let contents = std::fs::read_to_string(path).expect("artifact readable");
    serde_json::from_str(&contents).expect("artifact is JSON")
}

fn reasoning_contains(artifact: &serde_json::Value, needle: &str) -> bool {
    artifact["reasoning_steps"]
        .as_array()
        .expect("reasoning_steps array")
        .iter()
        .any(|step| step.as_str().unwrap_or("").contains(needle))
}

#[tokio::test(start_paused = true)]
async fn test_zero_adapters_still_writes_artifact() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 1.0);

    let orchestrator = Orchestrator::new(config, Vec::new());
    let artifact = run_and_read(&orchestrator).await;

    assert!(reasoning_contains(&artifact, "No platforms connected"));
    assert!(artifact["annotation_actions"].as_array().unwrap().is_empty());
    assert_eq!(artifact["summary"], "Completed daily run.");
}

#[tokio::test(start_paused = true)]
async fn test_connect_fault_downgraded_to_reasoning() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 1.0);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(MockAdapter::failing_connect(
        "appen",
        "connection refused",
    ))];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    // The raised fault became a normal not-connected entry, and the run
    // terminated as the zero-adapter case.
    assert!(reasoning_contains(&artifact, "appen: Error connecting"));
    assert!(reasoning_contains(&artifact, "No platforms connected"));
    assert!(artifact["annotation_actions"].as_array().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_exhausts_budget_without_touching_adapter() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path(), 1.0);
    config.runtime.dry_run = true;

    let adapter = MockAdapter::connected("appen")
        .with_projects(&["Project A"])
        .with_cap(5)
        .with_task_limit("Project A", 2); // would exhaust early if contacted

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    let action = &artifact["annotation_actions"][0];
    // Dry run reaches the full budget and never breaks on exhaustion
    assert_eq!(action["attempted"], 5);
    assert_eq!(action["samples_annotated"], 0);
    assert!(reasoning_contains(&artifact, "Dry run: would fetch/annotate"));
}

#[tokio::test(start_paused = true)]
async fn test_scope_exhaustion_ends_item_normally() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path(), 1.0);
    config.runtime.assist_mode = false;

    let adapter = MockAdapter::connected("toloka")
        .with_projects(&["Labeling run"])
        .with_task_limit("Labeling run", 3);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    let action = &artifact["annotation_actions"][0];
    assert_eq!(action["attempted"], 3);
    assert_eq!(action["samples_annotated"], 3);
    assert_eq!(action["notes"], "auto mode");
    assert!(reasoning_contains(&artifact, "No more tasks in Labeling run"));
}

#[tokio::test(start_paused = true)]
async fn test_assist_mode_never_submits() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 1.0); // assist_mode defaults on

    let adapter = MockAdapter::connected("appen")
        .with_projects(&["Project A"])
        .with_cap(4);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    let action = &artifact["annotation_actions"][0];
    assert_eq!(action["attempted"], 4);
    assert_eq!(action["samples_annotated"], 0);
    assert_eq!(action["notes"], "assist mode (no auto-submit)");
}

#[tokio::test(start_paused = true)]
async fn test_throttle_applies_cooldown_within_item() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path(), 1.0);
    config.runtime.assist_mode = false;

    let adapter = MockAdapter::connected("labelstudio")
        .with_projects(&["Sentiment"])
        .with_cap(2)
        .with_throttle_on(&[1]);
    let times = adapter.annotate_times_handle();

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);

    let artifact = run_and_read(&orchestrator).await;

    assert!(reasoning_contains(&artifact, "Throttled; backing off"));

    // The throttled attempt still counted, and the item kept its budget.
    let action = &artifact["annotation_actions"][0];
    assert_eq!(action["attempted"], 2);

    // The cooldown elapsed between outcome 1 and outcome 2.
    let times = times.lock().unwrap();
    assert_eq!(times.len(), 2);
    assert!(
        times[1] - times[0] >= THROTTLE_COOLDOWN,
        "cooldown must separate the two attempts"
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cutoff_stops_remaining_items() {
    let temp = TempDir::new().unwrap();
    // One-second budget; each unit of work costs a one-second pacing delay.
    let mut config = test_config(temp.path(), 1.0 / 3600.0);
    config.runtime.human_delay_ms = [1000, 1000];
    config.runtime.assist_mode = false;

    let adapter = MockAdapter::connected("appen").with_projects(&["First", "Second"]);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    // The first item got through its single pre-deadline unit of work;
    // the second item never started.
    let actions = artifact["annotation_actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["project"], "First");
    assert_eq!(actions[0]["attempted"], 1);
    assert!(reasoning_contains(&artifact, "Reached daily runtime budget"));
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_adapter_does_not_block_others() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path(), 1.0);
    config.runtime.assist_mode = false;

    let broken = MockAdapter::failing_connect("appen", "portal unreachable");
    let healthy = MockAdapter::connected("toloka")
        .with_projects(&["Survey"])
        .with_task_limit("Survey", 2);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(broken), Box::new(healthy)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    assert!(reasoning_contains(&artifact, "appen: Error connecting"));
    assert!(reasoning_contains(&artifact, "toloka: Found 1 active projects"));

    let actions = artifact["annotation_actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["project"], "Survey");
    assert_eq!(actions[0]["samples_annotated"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_per_item_fault_abandons_only_that_item() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path(), 1.0);
    config.runtime.assist_mode = false;

    let failing = MockAdapter::connected("appen")
        .with_projects(&["Doomed"])
        .with_failing_annotate();
    let healthy = MockAdapter::connected("toloka")
        .with_projects(&["Fine"])
        .with_task_limit("Fine", 1);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(failing), Box::new(healthy)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    assert!(reasoning_contains(&artifact, "annotation error in Doomed"));

    // Both items produced an action record; only the healthy one submitted.
    let actions = artifact["annotation_actions"].as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["project"], "Doomed");
    assert_eq!(actions[0]["samples_annotated"], 0);
    assert_eq!(actions[1]["project"], "Fine");
    assert_eq!(actions[1]["samples_annotated"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_qualification_fallback_after_projects() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 1.0);

    let adapter = MockAdapter::connected("appen")
        .with_projects(&["Project A"])
        .with_quals(&["Qual 1", "Qual 2", "Qual 3", "Qual 4"])
        .with_task_limit("Project A", 0)
        .with_task_limit("Qual 1", 0)
        .with_task_limit("Qual 2", 0)
        .with_task_limit("Qual 3", 0)
        .with_task_limit("Qual 4", 0);

    let adapters: Vec<Box<dyn PlatformAdapter>> = vec![Box::new(adapter)];
    let orchestrator = Orchestrator::new(config, adapters);
    let artifact = run_and_read(&orchestrator).await;

    // 1 project + first 3 qualifications; the 4th is dropped.
    let actions = artifact["annotation_actions"].as_array().unwrap();
    let projects: Vec<&str> = actions
        .iter()
        .map(|a| a["project"].as_str().unwrap())
        .collect();
    assert_eq!(projects, vec!["Project A", "Qual 1", "Qual 2", "Qual 3"]);
}
