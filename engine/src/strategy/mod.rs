//! Worklist selection strategy
//!
//! Turns the scopes discovered across all connected adapters into the
//! ordered, budgeted worklist the scheduler executes. `select` is a pure
//! function of its inputs: identical discoveries and config always
//! produce an identical worklist.

use crate::config::StrategyConfig;
use sdk::types::Scope;

/// Task type every scheduled item currently carries.
pub const TASK_TYPE_TEXT_GENERIC: &str = "text_generic";

/// Upper bound on a project item's budget, whatever the platform cap.
const PROJECT_BUDGET_CAP: u32 = 100;

/// How many qualifications are appended after projects.
///
/// Anything beyond the first 3 discovered qualifications is dropped when
/// projects exist. Deliberate bound, kept from the source system.
const FALLBACK_QUAL_LIMIT: usize = 3;

/// Budget for each appended qualification.
const FALLBACK_QUAL_BUDGET: u32 = 20;

/// Budget for each qualification when no projects were discovered at all.
const QUAL_ONLY_BUDGET: u32 = 50;

/// A scope discovered by one adapter, tagged with everything the
/// strategy needs to stay a pure function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredScope {
    /// Index into the run's adapter list
    pub adapter: usize,

    /// The owning platform's per-run sample cap
    pub daily_cap: u32,

    /// The discovered scope itself
    pub scope: Scope,
}

/// One entry of the worklist: which adapter to drive, on which scope,
/// with what task type, for at most how many samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Index into the run's adapter list
    pub adapter: usize,

    /// The scope to work on
    pub scope: Scope,

    /// Task type to annotate
    pub task_type: String,

    /// Cap on attempted samples for this scope in this run
    pub budget: u32,
}

/// Build the ordered worklist for one run.
///
/// Ordering rules:
/// 1. Every discovered project is scheduled first, in discovery order,
///    with `budget = min(100, daily_cap)`.
/// 2. With `fallback_to_qualifications` set and at least one project,
///    at most the first 3 discovered qualifications are appended with a
///    fixed budget of 20 each.
/// 3. With zero projects discovered anywhere, the worklist is instead
///    *all* qualifications at budget 50, a total override of rules 1-2,
///    not a merge.
pub fn select(
    projects: &[DiscoveredScope],
    quals: &[DiscoveredScope],
    config: &StrategyConfig,
) -> Vec<WorkItem> {
    // No projects anywhere: qualifications only, ignoring the fallback cap.
    if projects.is_empty() {
        return quals
            .iter()
            .map(|q| work_item(q, QUAL_ONLY_BUDGET))
            .collect();
    }

    let mut worklist: Vec<WorkItem> = projects
        .iter()
        .map(|p| work_item(p, PROJECT_BUDGET_CAP.min(p.daily_cap)))
        .collect();

    // Append a few qualifications after projects to make steady progress.
    if config.fallback_to_qualifications {
        worklist.extend(
            quals
                .iter()
                .take(FALLBACK_QUAL_LIMIT)
                .map(|q| work_item(q, FALLBACK_QUAL_BUDGET)),
        );
    }

    worklist
}

fn work_item(discovered: &DiscoveredScope, budget: u32) -> WorkItem {
    WorkItem {
        adapter: discovered.adapter,
        scope: discovered.scope.clone(),
        task_type: TASK_TYPE_TEXT_GENERIC.to_string(),
        budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(adapter: usize, cap: u32, name: &str) -> DiscoveredScope {
        DiscoveredScope {
            adapter,
            daily_cap: cap,
            scope: Scope::from_name(name),
        }
    }

    fn default_config() -> StrategyConfig {
        StrategyConfig {
            fallback_to_qualifications: true,
        }
    }

    #[test]
    fn test_projects_before_qualifications() {
        let projects = vec![discovered(0, 100, "Project A"), discovered(1, 100, "Project B")];
        let quals = vec![
            discovered(0, 100, "Qual 1"),
            discovered(0, 100, "Qual 2"),
            discovered(1, 100, "Qual 3"),
            discovered(1, 100, "Qual 4"),
            discovered(1, 100, "Qual 5"),
        ];

        let worklist = select(&projects, &quals, &default_config());

        assert_eq!(worklist.len(), 5, "2 projects + first 3 qualifications");
        assert_eq!(worklist[0].scope.name, "Project A");
        assert_eq!(worklist[1].scope.name, "Project B");
        assert_eq!(worklist[2].scope.name, "Qual 1");
        assert_eq!(worklist[3].scope.name, "Qual 2");
        assert_eq!(worklist[4].scope.name, "Qual 3");

        assert!(worklist[..2].iter().all(|item| item.budget == 100));
        assert!(worklist[2..].iter().all(|item| item.budget == 20));
    }

    #[test]
    fn test_project_budget_respects_daily_cap() {
        let projects = vec![discovered(0, 40, "Capped"), discovered(1, 500, "Generous")];

        let worklist = select(&projects, &[], &default_config());

        assert_eq!(worklist[0].budget, 40, "cap below 100 wins");
        assert_eq!(worklist[1].budget, 100, "cap above 100 is clamped");
    }

    #[test]
    fn test_no_fallback_when_disabled() {
        let projects = vec![discovered(0, 100, "Project A")];
        let quals = vec![discovered(0, 100, "Qual 1")];
        let config = StrategyConfig {
            fallback_to_qualifications: false,
        };

        let worklist = select(&projects, &quals, &config);

        assert_eq!(worklist.len(), 1);
        assert_eq!(worklist[0].scope.name, "Project A");
    }

    #[test]
    fn test_zero_projects_overrides_fallback_cap() {
        let quals = vec![
            discovered(0, 100, "Qual 1"),
            discovered(0, 100, "Qual 2"),
            discovered(1, 100, "Qual 3"),
            discovered(1, 100, "Qual 4"),
            discovered(1, 100, "Qual 5"),
        ];

        let worklist = select(&[], &quals, &default_config());

        // All five are scheduled, not just the first 3, each at budget 50.
        assert_eq!(worklist.len(), 5);
        assert!(worklist.iter().all(|item| item.budget == 50));
        assert_eq!(worklist[4].scope.name, "Qual 5");
    }

    #[test]
    fn test_select_is_idempotent() {
        let projects = vec![discovered(0, 60, "Project A")];
        let quals = vec![discovered(1, 100, "Qual 1"), discovered(1, 100, "Qual 2")];
        let config = default_config();

        let first = select(&projects, &quals, &config);
        let second = select(&projects, &quals, &config);

        assert_eq!(first, second);
    }

    #[test]
    fn test_task_type_is_text_generic() {
        let projects = vec![discovered(0, 100, "Project A")];
        let worklist = select(&projects, &[], &default_config());
        assert_eq!(worklist[0].task_type, TASK_TYPE_TEXT_GENERIC);
    }

    #[test]
    fn test_empty_inputs_empty_worklist() {
        assert!(select(&[], &[], &default_config()).is_empty());
    }
}
