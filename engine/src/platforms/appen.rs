//! Appen portal adapter
//!
//! Drives the Appen contributor portal through a headless Chrome session.
//! Credentials come from the environment; a cookie state file lets future
//! runs skip the login flow.

use crate::annotate::{Annotator, TextGenericAnnotator};
use crate::config::PlatformConfig;
use crate::platforms::browser::{LoginSpec, PortalSession};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use rand::Rng;
use sdk::adapter::{PlatformAdapter, DEFAULT_DAILY_CAP};
use sdk::errors::EngineError;
use sdk::types::{ConnectStatus, SampleOutcome, SampleUnit, Scope};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::warn;

/// Environment variable holding the login email.
pub const EMAIL_ENV: &str = "APPEN_EMAIL";

/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "APPEN_PASSWORD";

const STATE_PATH: &str = ".session_states/appen_state.json";

const PROJECT_CARD_SELECTOR: &str =
    "[data-testid=\"project-card\"], .project-card, [role=\"article\"]";
const QUALIFICATION_CARD_SELECTOR: &str =
    "[data-testid=\"qualification-card\"], .qualification-card";

/// Adapter for the Appen contributor portal.
pub struct AppenAdapter {
    cfg: PlatformConfig,
    annotator: TextGenericAnnotator,
    retry: RetryPolicy,
    session: Arc<Mutex<Option<PortalSession>>>,
}

impl AppenAdapter {
    pub fn new(cfg: PlatformConfig) -> Self {
        Self {
            cfg,
            annotator: TextGenericAnnotator,
            retry: RetryPolicy::default(),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Run a blocking closure against the established session.
    ///
    /// Yields the default value when no session exists or the browser
    /// thread cannot be joined; discovery callers get empty lists either
    /// way, per the contract.
    async fn with_session<T, F>(&self, work: F) -> T
    where
        T: Default + Send + 'static,
        F: FnOnce(&PortalSession) -> T + Send + 'static,
    {
        let slot = Arc::clone(&self.session);
        spawn_blocking(move || {
            let guard = match slot.lock() {
                Ok(guard) => guard,
                Err(_) => return T::default(),
            };
            match guard.as_ref() {
                Some(session) => work(session),
                None => T::default(),
            }
        })
        .await
        .unwrap_or_else(|e| {
            warn!("appen: browser task failed: {}", e);
            T::default()
        })
    }
}

#[async_trait]
impl PlatformAdapter for AppenAdapter {
    fn name(&self) -> &str {
        "appen"
    }

    fn daily_cap(&self) -> u32 {
        self.cfg.daily_cap.unwrap_or(DEFAULT_DAILY_CAP)
    }

    async fn connect(&self) -> Result<ConnectStatus, EngineError> {
        let email = std::env::var(EMAIL_ENV).unwrap_or_default();
        let password = std::env::var(PASSWORD_ENV).unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Ok(ConnectStatus::failed(format!(
                "Missing {}/{} secrets.",
                EMAIL_ENV, PASSWORD_ENV
            )));
        }

        let spec = Arc::new(LoginSpec {
            platform: "appen",
            base_url: self.cfg.base_url.clone(),
            headless: self.cfg.headless,
            email,
            password,
            state_path: PathBuf::from(STATE_PATH),
        });

        let slot = Arc::clone(&self.session);
        self.retry
            .run_with(
                |_attempt| {
                    let spec = Arc::clone(&spec);
                    let slot = Arc::clone(&slot);
                    async move {
                        spawn_blocking(move || -> Result<(), EngineError> {
                            let session = PortalSession::establish(&spec)?;
                            *slot.lock().map_err(|_| {
                                EngineError::Browser("session lock poisoned".to_string())
                            })? = Some(session);
                            Ok(())
                        })
                        .await
                        .map_err(|e| EngineError::Browser(format!("browser task failed: {}", e)))?
                    }
                },
                |e| matches!(e, EngineError::Browser(_) | EngineError::Timeout(_)),
            )
            .await?;

        Ok(ConnectStatus::connected("Connected and session established."))
    }

    async fn list_active_projects(&self) -> Vec<Scope> {
        let url = format!("{}/projects", self.cfg.base_url);
        self.with_session(move |session| {
            let list = || -> Result<Vec<Scope>, EngineError> {
                session
                    .tab
                    .navigate_to(&url)
                    .map_err(|e| EngineError::Browser(e.to_string()))?;
                session
                    .tab
                    .wait_until_navigated()
                    .map_err(|e| EngineError::Browser(e.to_string()))?;

                let cards = session
                    .tab
                    .find_elements(PROJECT_CARD_SELECTOR)
                    .unwrap_or_default();

                let mut result = Vec::new();
                for card in cards {
                    let text = card.get_inner_text().unwrap_or_default();
                    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
                    let name = lines.next().unwrap_or("Project").to_string();
                    // Cards without a status line are listed as active.
                    let status = lines.last().unwrap_or("").to_lowercase();
                    if status.is_empty() || status.contains("active") {
                        result.push(Scope::from_name(name));
                    }
                }
                Ok(result)
            };

            list().unwrap_or_else(|e| {
                warn!("appen: project discovery failed: {}", e);
                Vec::new()
            })
        })
        .await
    }

    async fn list_qualifications(&self) -> Vec<Scope> {
        let url = format!("{}/qualifications", self.cfg.base_url);
        self.with_session(move |session| {
            let list = || -> Result<Vec<Scope>, EngineError> {
                session
                    .tab
                    .navigate_to(&url)
                    .map_err(|e| EngineError::Browser(e.to_string()))?;
                session
                    .tab
                    .wait_until_navigated()
                    .map_err(|e| EngineError::Browser(e.to_string()))?;

                let rows = session
                    .tab
                    .find_elements(QUALIFICATION_CARD_SELECTOR)
                    .unwrap_or_default();

                Ok(rows
                    .iter()
                    .filter_map(|row| {
                        let text = row.get_inner_text().ok()?;
                        let title = text.lines().next()?.trim().to_string();
                        (!title.is_empty()).then(|| Scope::from_name(title))
                    })
                    .collect())
            };

            list().unwrap_or_else(|e| {
                warn!("appen: qualification discovery failed: {}", e);
                Vec::new()
            })
        })
        .await
    }

    async fn fetch_next_task(&self, scope: &Scope) -> Result<Option<SampleUnit>, EngineError> {
        // Placeholder navigation; adjust for the real portal task pages.
        let wait_ms = rand::thread_rng().gen_range(500..=1200);
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        Ok(Some(SampleUnit {
            id: "sample-id".to_string(),
            content: "text snippet".to_string(),
            project: scope.name.clone(),
        }))
    }

    async fn annotate_and_submit(
        &self,
        sample: &SampleUnit,
        _task_type: &str,
        assist_mode: bool,
    ) -> Result<SampleOutcome, EngineError> {
        // Emulate the work; pre-fill but never submit in assist mode.
        let wait_ms = rand::thread_rng().gen_range(300..=800);
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        let _annotation = self.annotator.annotate(sample);

        if assist_mode {
            Ok(SampleOutcome::attempted_only("assist mode pre-filled"))
        } else {
            Ok(SampleOutcome::submitted_one("auto-submitted"))
        }
    }
}
