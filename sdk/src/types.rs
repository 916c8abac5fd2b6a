//! Adapter boundary types
//!
//! These are the data shapes that cross the `PlatformAdapter` contract:
//! discovered scopes, fetched sample units, per-cycle outcomes, and the
//! adapter-local HTTP status bookkeeping used for reporting.

use serde::{Deserialize, Serialize};

/// Maximum length of a stored scope identifier.
///
/// Platform UIs produce arbitrarily long titles; identifiers derived from
/// them are truncated to this bound to stay storage-safe.
pub const MAX_SCOPE_ID_LEN: usize = 64;

/// A unit of selectable work on a platform: a project or a qualification.
///
/// Scopes are discovered fresh on every run and never persisted. Each scope
/// is owned by exactly one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Opaque identifier, truncated to [`MAX_SCOPE_ID_LEN`] characters
    pub id: String,

    /// Human-readable display name
    pub name: String,
}

impl Scope {
    /// Create a scope from an id and a display name.
    ///
    /// The id is trimmed and truncated to [`MAX_SCOPE_ID_LEN`] characters.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id: String = id.into();
        let id = id.trim().chars().take(MAX_SCOPE_ID_LEN).collect();
        Self {
            id,
            name: name.into(),
        }
    }

    /// Create a scope whose id is derived from its display name.
    ///
    /// Platform listings often expose only a title; the truncated title
    /// doubles as the identifier, as the source portals do.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }
}

/// One fetched task unit, ready to be annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleUnit {
    /// Platform-side task identifier
    pub id: String,

    /// Task payload (text snippet or serialized task data)
    pub content: String,

    /// Display name of the scope this sample belongs to
    pub project: String,
}

/// Result of one fetch + annotate + submit cycle.
///
/// Invariants: `attempted >= 1` and `submitted <= attempted`. Use the
/// constructors to get outcomes that hold them by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOutcome {
    /// Number of samples attempted in this cycle (at least 1)
    pub attempted: u32,

    /// Number of samples actually committed to the platform
    pub submitted: u32,

    /// The platform signalled rate-limiting; advisory, not a fault
    pub throttled: bool,

    /// Free-form note for the run summary
    pub notes: String,
}

impl SampleOutcome {
    /// An outcome with explicit counts, clamped to the invariants.
    pub fn new(attempted: u32, submitted: u32, notes: impl Into<String>) -> Self {
        let attempted = attempted.max(1);
        Self {
            attempted,
            submitted: submitted.min(attempted),
            throttled: false,
            notes: notes.into(),
        }
    }

    /// One attempt, nothing committed (assist mode or a soft failure).
    pub fn attempted_only(notes: impl Into<String>) -> Self {
        Self::new(1, 0, notes)
    }

    /// One attempt, one committed submission.
    pub fn submitted_one(notes: impl Into<String>) -> Self {
        Self::new(1, 1, notes)
    }

    /// Mark the outcome as throttled by the platform.
    pub fn with_throttled(mut self, throttled: bool) -> Self {
        self.throttled = throttled;
        self
    }
}

/// Result of an adapter's `connect()` call.
///
/// Missing credentials and rejected logins are normal outcomes, not faults:
/// they yield `ok = false` with a reason the orchestrator records verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectStatus {
    pub ok: bool,
    pub message: String,
}

impl ConnectStatus {
    /// A successful connection with a message for the audit trail.
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// A failed connection with the reason (no secrets in the message).
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// A computed annotation for one sample.
///
/// The heuristic behind it is a placeholder decision function; adapters only
/// rely on this fixed shape when pre-filling or submitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Platform-specific result payload (e.g. a `choices` result array)
    pub labels: serde_json::Value,

    /// Heuristic confidence in [0.0, 1.0]
    pub confidence: f64,
}

/// Counts of HTTP response status classes seen by a REST adapter.
///
/// Mutated on every HTTP call, read only for reporting at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSummary {
    /// Status of the most recent response, if any
    pub last_status: Option<u16>,

    /// Number of 2xx responses
    pub count_2xx: u64,

    /// Number of 4xx responses
    pub count_4xx: u64,

    /// Number of 5xx responses
    pub count_5xx: u64,
}

impl HttpSummary {
    /// Record one response status, whatever its class.
    pub fn record(&mut self, status: u16) {
        self.last_status = Some(status);
        match status {
            200..=299 => self.count_2xx += 1,
            400..=499 => self.count_4xx += 1,
            500..=599 => self.count_5xx += 1,
            _ => {}
        }
    }

    /// Total number of recorded responses.
    pub fn total(&self) -> u64 {
        self.count_2xx + self.count_4xx + self.count_5xx
    }
}
