//! Label Studio adapter
//!
//! Integrates with a Label Studio instance over its REST API. Supports
//! token authentication and email/password login, pages tasks out of a
//! project into an internal queue, and submits annotations produced by
//! the configured annotator. All requests run under the shared retry
//! policy; every response feeds the adapter-local HTTP status counters.

use crate::annotate::Annotator;
use crate::config::PlatformConfig;
use crate::retry::{status_error, RetryPolicy};
use async_trait::async_trait;
use sdk::adapter::{PlatformAdapter, DEFAULT_DAILY_CAP};
use sdk::errors::EngineError;
use sdk::types::{ConnectStatus, HttpSummary, SampleOutcome, SampleUnit, Scope};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the API token (takes precedence).
pub const TOKEN_ENV: &str = "LABEL_STUDIO_API_TOKEN";

/// Environment variable holding the login email.
pub const EMAIL_ENV: &str = "LABEL_STUDIO_EMAIL";

/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "LABEL_STUDIO_PASSWORD";

/// Environment variable pinning discovery to a single project.
pub const PROJECT_ID_ENV: &str = "LABEL_STUDIO_PROJECT_ID";

/// How many tasks one discovery page pulls into the queue.
const TASK_PAGE_SIZE: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// How the adapter authenticates against the instance.
#[derive(Debug, Clone)]
pub enum LsCredentials {
    /// API token sent as an `Authorization: Token …` header
    Token(String),

    /// Email/password login; the session cookie carries auth afterwards
    Login { email: String, password: String },

    /// Nothing configured; `connect()` reports a failed status
    None,
}

impl LsCredentials {
    /// Read credentials from the environment, token first.
    pub fn from_env() -> Self {
        let get = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(token) = get(TOKEN_ENV) {
            return Self::Token(token);
        }
        match (get(EMAIL_ENV), get(PASSWORD_ENV)) {
            (Some(email), Some(password)) => Self::Login { email, password },
            _ => Self::None,
        }
    }
}

/// Per-scope task queue filled one page at a time.
#[derive(Default)]
struct TaskQueue {
    scope_id: Option<String>,
    primed: bool,
    tasks: VecDeque<SampleUnit>,
}

/// Adapter for a Label Studio instance.
pub struct LabelStudioAdapter {
    cfg: PlatformConfig,
    annotator: Arc<dyn Annotator>,
    credentials: LsCredentials,
    project_id: Option<String>,
    client: reqwest::Client,
    retry: RetryPolicy,
    auth_header: Mutex<Option<String>>,
    http: Mutex<HttpSummary>,
    queue: Mutex<TaskQueue>,
}

impl LabelStudioAdapter {
    /// Create an adapter with credentials and project pin from the
    /// environment.
    pub fn new(cfg: PlatformConfig, annotator: Arc<dyn Annotator>) -> Self {
        let project_id = std::env::var(PROJECT_ID_ENV).ok().filter(|v| !v.is_empty());

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            cfg,
            annotator,
            credentials: LsCredentials::from_env(),
            project_id,
            client,
            retry: RetryPolicy::default(),
            auth_header: Mutex::new(None),
            http: Mutex::new(HttpSummary::default()),
            queue: Mutex::new(TaskQueue::default()),
        }
    }

    /// Override the credentials (tests and embedding callers).
    pub fn with_credentials(mut self, credentials: LsCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Pin discovery to a single project id.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    fn base_url(&self) -> String {
        self.cfg.base_url.trim_end_matches('/').to_string()
    }

    /// Perform one request under the retry policy.
    ///
    /// Returns the final status and (leniently parsed) JSON body for all
    /// non-auth, non-5xx statuses; 401/403 surface as an authentication
    /// fault, 5xx and timeouts are retried until the policy gives up.
    async fn request(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<Value>,
    ) -> Result<(u16, Value), EngineError> {
        self.retry
            .run(|attempt| {
                let method = method.clone();
                let url = url.clone();
                let body = body.clone();
                async move {
                    debug!("labelstudio: {} {} (attempt {})", method, url, attempt);

                    let mut request = self.client.request(method, &url);
                    if let Some(header) = self.auth_value() {
                        request = request.header("Authorization", header);
                    }
                    if let Some(body) = body {
                        request = request.json(&body);
                    }

                    let response = request.send().await.map_err(|e| {
                        if e.is_timeout() || e.is_connect() {
                            EngineError::Timeout(format!("{} did not respond: {}", url, e))
                        } else {
                            EngineError::Http {
                                status: 0,
                                message: e.to_string(),
                            }
                        }
                    })?;

                    let status = response.status().as_u16();
                    self.record_status(status);

                    if status == 401 || status == 403 || status >= 500 {
                        let message = response.text().await.unwrap_or_default();
                        return Err(status_error(status, message));
                    }

                    let value = response.json::<Value>().await.unwrap_or(Value::Null);
                    Ok((status, value))
                }
            })
            .await
    }

    fn auth_value(&self) -> Option<String> {
        self.auth_header
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    fn record_status(&self, status: u16) {
        if let Ok(mut http) = self.http.lock() {
            http.record(status);
        }
    }

    /// Email/password login: try the v2 path, fall back to v1 on 404.
    async fn login(&self, email: &str, password: &str) -> Result<(), EngineError> {
        let payload = json!({ "email": email, "password": password });

        for login_path in ["/api/user/login", "/user/login"] {
            let url = format!("{}{}", self.base_url(), login_path);
            let (status, _body) = self
                .request(reqwest::Method::POST, url, Some(payload.clone()))
                .await?;

            match status {
                200..=299 => return Ok(()),
                404 => continue,
                status => {
                    return Err(EngineError::Http {
                        status,
                        message: "login rejected".to_string(),
                    })
                }
            }
        }

        Err(EngineError::Http {
            status: 404,
            message: "no login endpoint found".to_string(),
        })
    }

    /// Pull one page of tasks for a project into sample units.
    async fn fetch_task_page(&self, scope: &Scope) -> Result<Vec<SampleUnit>, EngineError> {
        let url = format!(
            "{}/api/projects/{}/tasks?page_size={}&ordering=-created_at",
            self.base_url(),
            scope.id,
            TASK_PAGE_SIZE
        );
        let (_status, body) = self.request(reqwest::Method::GET, url, None).await?;

        // The endpoint returns either a bare array or {"tasks": [...]}.
        let items = match &body {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("tasks")
                .and_then(Value::as_array)
                .map(|v| v.as_slice())
                .unwrap_or(&[]),
            _ => &[],
        };

        Ok(items
            .iter()
            .filter_map(|item| {
                let id = item.get("id")?;
                Some(SampleUnit {
                    id: id.to_string(),
                    content: task_text(item.get("data")),
                    project: scope.name.clone(),
                })
            })
            .collect())
    }
}

/// Extract the first string field of a task's data payload, falling back
/// to the serialized payload itself.
fn task_text(data: Option<&Value>) -> String {
    match data {
        Some(Value::Object(map)) => map
            .values()
            .find_map(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl PlatformAdapter for LabelStudioAdapter {
    fn name(&self) -> &str {
        "labelstudio"
    }

    fn daily_cap(&self) -> u32 {
        self.cfg.daily_cap.unwrap_or(DEFAULT_DAILY_CAP)
    }

    async fn connect(&self) -> Result<ConnectStatus, EngineError> {
        match &self.credentials {
            LsCredentials::Token(token) => {
                if let Ok(mut guard) = self.auth_header.lock() {
                    *guard = Some(format!("Token {}", token));
                }
            }
            LsCredentials::Login { email, password } => {
                let (email, password) = (email.clone(), password.clone());
                if let Err(e) = self.login(&email, &password).await {
                    return match e {
                        EngineError::AuthRejected(_) | EngineError::Http { .. } => Ok(
                            ConnectStatus::failed(format!("Label Studio login failed: {}", e)),
                        ),
                        other => Err(other),
                    };
                }
            }
            LsCredentials::None => {
                return Ok(ConnectStatus::failed(format!(
                    "Must set {} or {} and {}.",
                    TOKEN_ENV, EMAIL_ENV, PASSWORD_ENV
                )));
            }
        }

        // Validate the session against the current-user endpoint.
        let url = format!("{}/api/current-user", self.base_url());
        match self.request(reqwest::Method::GET, url, None).await {
            Ok((status, _)) if (200..300).contains(&status) => {
                Ok(ConnectStatus::connected("Connected and session validated."))
            }
            Ok((status, _)) => Ok(ConnectStatus::failed(format!(
                "Auth validation failed with status {}.",
                status
            ))),
            Err(EngineError::AuthRejected(reason)) => Ok(ConnectStatus::failed(format!(
                "Authentication failed: {}.",
                reason
            ))),
            Err(other) => Err(other),
        }
    }

    async fn list_active_projects(&self) -> Vec<Scope> {
        // A pinned project wins over listing the instance.
        if let Some(project_id) = &self.project_id {
            let url = format!("{}/api/projects/{}", self.base_url(), project_id);
            let fallback_name = format!("Project {}", project_id);
            return match self.request(reqwest::Method::GET, url, None).await {
                Ok((status, body)) if (200..300).contains(&status) => {
                    let name = body
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or(&fallback_name);
                    vec![Scope::new(project_id.clone(), name)]
                }
                Ok(_) => vec![Scope::new(project_id.clone(), fallback_name)],
                Err(e) => {
                    warn!("labelstudio: project lookup failed: {}", e);
                    vec![Scope::new(project_id.clone(), fallback_name)]
                }
            };
        }

        let url = format!("{}/api/projects", self.base_url());
        match self.request(reqwest::Method::GET, url, None).await {
            Ok((status, body)) if (200..300).contains(&status) => {
                let items = match &body {
                    Value::Array(items) => items.as_slice(),
                    Value::Object(map) => map
                        .get("results")
                        .and_then(Value::as_array)
                        .map(|v| v.as_slice())
                        .unwrap_or(&[]),
                    _ => &[],
                };

                items
                    .iter()
                    .filter_map(|item| {
                        let id = item.get("id")?;
                        let title = item
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or("Project");
                        Some(Scope::new(id.to_string(), title))
                    })
                    .collect()
            }
            Ok((status, _)) => {
                warn!("labelstudio: project listing returned status {}", status);
                Vec::new()
            }
            Err(e) => {
                warn!("labelstudio: project discovery failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn list_qualifications(&self) -> Vec<Scope> {
        // Label Studio has no qualification concept.
        Vec::new()
    }

    async fn fetch_next_task(&self, scope: &Scope) -> Result<Option<SampleUnit>, EngineError> {
        // Serve from the queue first; the guard never crosses an await.
        {
            let mut queue = self
                .queue
                .lock()
                .map_err(|_| EngineError::Serialization("task queue poisoned".to_string()))?;

            if queue.scope_id.as_deref() != Some(scope.id.as_str()) {
                queue.scope_id = Some(scope.id.clone());
                queue.primed = false;
                queue.tasks.clear();
            }

            if let Some(task) = queue.tasks.pop_front() {
                return Ok(Some(task));
            }
            if queue.primed {
                // One page per scope per run; the scope is exhausted.
                return Ok(None);
            }
        }

        let page = self.fetch_task_page(scope).await?;

        let mut queue = self
            .queue
            .lock()
            .map_err(|_| EngineError::Serialization("task queue poisoned".to_string()))?;
        queue.primed = true;
        queue.tasks.extend(page);
        Ok(queue.tasks.pop_front())
    }

    async fn annotate_and_submit(
        &self,
        sample: &SampleUnit,
        task_type: &str,
        assist_mode: bool,
    ) -> Result<SampleOutcome, EngineError> {
        if !self.annotator.supports(task_type) {
            return Ok(SampleOutcome::attempted_only(format!(
                "no annotator for task type {}",
                task_type
            )));
        }

        let annotation = self.annotator.annotate(sample);

        if assist_mode {
            return Ok(SampleOutcome::attempted_only("assist mode pre-filled"));
        }

        let url = format!("{}/api/tasks/{}/annotations", self.base_url(), sample.id);
        let payload = json!({ "result": annotation.labels });
        let (status, _body) = self
            .request(reqwest::Method::POST, url, Some(payload))
            .await?;

        match status {
            200..=299 => Ok(SampleOutcome::submitted_one("auto-submitted")),
            429 => Ok(SampleOutcome::attempted_only("rate limited").with_throttled(true)),
            status => Ok(SampleOutcome::attempted_only(format!(
                "submission failed with status {}",
                status
            ))),
        }
    }

    fn http_summary(&self) -> Option<HttpSummary> {
        self.http.lock().ok().map(|guard| guard.clone())
    }
}
