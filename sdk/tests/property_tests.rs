use proptest::prelude::*;
use sdk::errors::{EngineError, GleanerErrorExt};
use sdk::types::{SampleOutcome, Scope, MAX_SCOPE_ID_LEN};

// Property: Error User Hint Completeness
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        // Encompass various error types to ensure they always return a valid user hint string
        // that doesn't panic or expose raw internal data directly in typical cases.
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::MissingCredentials(error_str.clone()),
            EngineError::AuthRejected(error_str.clone()),
            EngineError::Timeout(error_str.clone()),
            EngineError::Browser(error_str.clone()),
            EngineError::Serialization(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            // Hint should not be empty, and rendering must never panic
            prop_assert!(!hint.is_empty());
            let _ = err.to_string();
        }
    }
}

// Property: Scope Identifier Bound
proptest! {
    #[test]
    fn test_scope_id_always_bounded(name in "\\PC*") {
        let scope = Scope::from_name(name.clone());
        prop_assert!(scope.id.chars().count() <= MAX_SCOPE_ID_LEN);
        // The display name survives untouched
        prop_assert_eq!(scope.name, name);
    }
}

// Property: Sample Outcome Invariants
//
// For every SampleOutcome built through the constructors:
// attempted >= 1 and 0 <= submitted <= attempted.
proptest! {
    #[test]
    fn test_sample_outcome_invariants(attempted in 0u32..10_000, submitted in 0u32..10_000) {
        let outcome = SampleOutcome::new(attempted, submitted, "prop");
        prop_assert!(outcome.attempted >= 1);
        prop_assert!(outcome.submitted <= outcome.attempted);
    }
}

// Property: Outcome serialization round-trip keeps the counts intact
proptest! {
    #[test]
    fn test_sample_outcome_serde_roundtrip(attempted in 1u32..1000, submitted in 0u32..1000, throttled: bool) {
        let outcome = SampleOutcome::new(attempted, submitted, "note").with_throttled(throttled);
        let json = serde_json::to_string(&outcome).expect("serialize");
        let back: SampleOutcome = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(back, outcome);
    }
}
