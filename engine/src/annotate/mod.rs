//! Annotation heuristics
//!
//! Pluggable decision functions that turn a fetched sample into an
//! annotation payload. These are placeholders satisfying a fixed
//! interface: adapters decide whether to pre-fill only (assist mode) or
//! to submit the result, and nothing here models annotation quality.

use sdk::types::{Annotation, SampleUnit};
use serde_json::json;

/// Trait implemented by annotation heuristics.
pub trait Annotator: Send + Sync {
    /// Whether this annotator can handle the given task type.
    fn supports(&self, _task_type: &str) -> bool {
        true
    }

    /// Compute an annotation for one sample.
    fn annotate(&self, sample: &SampleUnit) -> Annotation;
}

/// Pass-through annotator with low confidence.
///
/// Adapters treat low-confidence output as "pre-fill only"; it never
/// carries enough signal to auto-submit on its own merits.
#[derive(Debug, Default)]
pub struct TextGenericAnnotator;

impl Annotator for TextGenericAnnotator {
    fn annotate(&self, _sample: &SampleUnit) -> Annotation {
        Annotation {
            labels: json!({ "answer": "placeholder" }),
            confidence: 0.2,
        }
    }
}

/// Deterministic keyword-based choice annotator.
///
/// For a text/choices project: "Positive" if the text contains
/// good/happy/love, else "Negative". The payload is a Label Studio
/// `choices` result keyed by the configured control and field names.
#[derive(Debug, Clone)]
pub struct KeywordChoiceAnnotator {
    /// Name of the labeling control (Label Studio `from_name`)
    pub from_name: String,

    /// Name of the annotated field (Label Studio `to_name`)
    pub to_name: String,
}

impl Default for KeywordChoiceAnnotator {
    fn default() -> Self {
        Self {
            from_name: "label".to_string(),
            to_name: "text".to_string(),
        }
    }
}

const POSITIVE_KEYWORDS: &[&str] = &["good", "happy", "love"];

impl Annotator for KeywordChoiceAnnotator {
    fn supports(&self, task_type: &str) -> bool {
        task_type == "text_generic"
    }

    fn annotate(&self, sample: &SampleUnit) -> Annotation {
        let lower = sample.content.to_lowercase();
        let label = if POSITIVE_KEYWORDS.iter().any(|word| lower.contains(word)) {
            "Positive"
        } else {
            "Negative"
        };

        Annotation {
            labels: json!([{
                "from_name": self.from_name,
                "to_name": self.to_name,
                "type": "choices",
                "value": { "choices": [label] },
            }]),
            confidence: 0.5,
        }
    }
}
