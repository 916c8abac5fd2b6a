//! Run summary recording
//!
//! The run summary is the audit trail of one run: an append-only,
//! chronological list of reasoning steps, one action record per worklist
//! item, and a single closing summary string. It is owned exclusively by
//! the orchestrator, serialized exactly once at run end, and then
//! discarded; nothing persists across runs beyond the written artifact.

use chrono::Utc;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One per-scope action record in the summary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationAction {
    /// Display name of the scope that was worked
    pub project: String,

    /// Task type that was annotated
    pub task_type: String,

    /// Samples actually committed for this scope
    pub samples_annotated: u32,

    /// Samples attempted for this scope
    pub attempted: u32,

    /// Mode note ("assist mode (no auto-submit)" or "auto mode")
    pub notes: String,
}

/// Accumulator for one run's audit trail.
///
/// Serialized shape, exactly:
/// `{reasoning_steps: [...], annotation_actions: [...], summary: "..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Ordered reasoning entries, appended throughout the run
    pub reasoning_steps: Vec<String>,

    /// One record per completed (or cut-off) worklist item
    pub annotation_actions: Vec<AnnotationAction>,

    /// Closing summary line, set once during finalization
    pub summary: String,
}

impl RunSummary {
    /// Create an empty summary at run start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one reasoning entry (chronological, append-only).
    pub fn add_reasoning(&mut self, message: impl Into<String>) {
        self.reasoning_steps.push(message.into());
    }

    /// Append one action record.
    pub fn add_action(&mut self, action: AnnotationAction) {
        self.annotation_actions.push(action);
    }

    /// Set the single closing summary string.
    pub fn set_summary(&mut self, text: impl Into<String>) {
        self.summary = text.into();
    }

    /// Write the daily artifact: `<dir>/summary-<UTC date>.json`.
    ///
    /// Creates the directory if absent. A second run on the same day
    /// overwrites the file deterministically: last run wins.
    pub fn write_daily(&self, out_dir: &Path) -> Result<PathBuf, EngineError> {
        let name = format!("summary-{}.json", Utc::now().format("%Y-%m-%d"));
        self.write_to(out_dir, &name)
    }

    /// Write the run-timestamped artifact:
    /// `<dir>/summary-<UTC timestamp>.json`.
    ///
    /// Used by the lighter-weight preflight entrypoint, where several
    /// invocations per day must not clobber each other.
    pub fn write_timestamped(&self, out_dir: &Path) -> Result<PathBuf, EngineError> {
        let name = format!("summary-{}.json", Utc::now().format("%Y%m%dT%H%M%SZ"));
        self.write_to(out_dir, &name)
    }

    fn write_to(&self, out_dir: &Path, file_name: &str) -> Result<PathBuf, EngineError> {
        fs::create_dir_all(out_dir)?;

        let path = out_dir.join(file_name);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;

        info!("Wrote run summary: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_summary() -> RunSummary {
        let mut summary = RunSummary::new();
        summary.add_reasoning("Loaded configuration and initialized session.");
        summary.add_reasoning("appen: Connected and session established.");
        summary.add_action(AnnotationAction {
            project: "Project A".to_string(),
            task_type: "text_generic".to_string(),
            samples_annotated: 3,
            attempted: 5,
            notes: "auto mode".to_string(),
        });
        summary.set_summary("Completed daily run.");
        summary
    }

    #[test]
    fn test_artifact_shape() {
        let temp = TempDir::new().unwrap();
        let path = sample_summary().write_daily(temp.path()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();

        // Exactly the three top-level keys, nothing else
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(value["reasoning_steps"].as_array().unwrap().len(), 2);
        assert_eq!(value["summary"], "Completed daily run.");

        let action = &value["annotation_actions"][0];
        assert_eq!(action["project"], "Project A");
        assert_eq!(action["samples_annotated"], 3);
        assert_eq!(action["attempted"], 5);
        assert_eq!(action["notes"], "auto mode");
    }

    #[test]
    fn test_daily_file_name_and_overwrite() {
        let temp = TempDir::new().unwrap();

        let first = sample_summary().write_daily(temp.path()).unwrap();
        let expected = format!("summary-{}.json", Utc::now().format("%Y-%m-%d"));
        assert_eq!(first.file_name().unwrap().to_str().unwrap(), expected);

        // A later run the same day replaces the artifact: last run wins.
        let mut second_summary = RunSummary::new();
        second_summary.set_summary("Second run.");
        let second = second_summary.write_daily(temp.path()).unwrap();
        assert_eq!(first, second);

        let contents = std::fs::read_to_string(&second).unwrap();
        assert!(contents.contains("Second run."));

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("out").join("summaries");

        let path = sample_summary().write_daily(&nested).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_run_still_serializes() {
        // A zero-adapter run writes an artifact with an empty action list.
        let temp = TempDir::new().unwrap();
        let mut summary = RunSummary::new();
        summary.add_reasoning("No platforms connected; stopping.");
        summary.set_summary("Completed daily run.");

        let path = summary.write_timestamped(temp.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(value["annotation_actions"].as_array().unwrap().is_empty());
    }
}
