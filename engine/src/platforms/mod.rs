//! Platform adapter implementations
//!
//! One adapter per supported platform, all behind the sdk's
//! `PlatformAdapter` trait. Navigation and API mechanics stay inside the
//! adapter modules; the scheduler only ever sees the contract.

use crate::annotate::KeywordChoiceAnnotator;
use crate::config::Config;
use sdk::adapter::PlatformAdapter;
use std::sync::Arc;

/// Appen portal adapter (browser session)
pub mod appen;

/// Shared browser-session plumbing for portal adapters
pub mod browser;

/// Label Studio adapter (REST API)
pub mod labelstudio;

/// Toloka portal adapter (browser session)
pub mod toloka;

/// Instantiate one adapter per enabled platform, in fixed order.
///
/// Disabled platforms get no adapter at all. The order (appen, toloka,
/// labelstudio) is stable so discovery output and summaries are
/// deterministic across runs with the same config.
pub fn build_adapters(config: &Config) -> Vec<Box<dyn PlatformAdapter>> {
    let mut adapters: Vec<Box<dyn PlatformAdapter>> = Vec::new();

    if config.platforms.appen.enabled {
        adapters.push(Box::new(appen::AppenAdapter::new(
            config.platforms.appen.clone(),
        )));
    }

    if config.platforms.toloka.enabled {
        adapters.push(Box::new(toloka::TolokaAdapter::new(
            config.platforms.toloka.clone(),
        )));
    }

    if config.platforms.labelstudio.enabled {
        adapters.push(Box::new(labelstudio::LabelStudioAdapter::new(
            config.platforms.labelstudio.clone(),
            Arc::new(KeywordChoiceAnnotator::default()),
        )));
    }

    adapters
}

/// Credential environment variables each platform's `connect()` reads.
///
/// Used by the doctor and preflight commands to report credential
/// presence without ever reading the values.
pub fn credential_env_vars(platform: &str) -> &'static [&'static str] {
    match platform {
        "appen" => &[appen::EMAIL_ENV, appen::PASSWORD_ENV],
        "toloka" => &[toloka::EMAIL_ENV, toloka::PASSWORD_ENV],
        "labelstudio" => &[
            labelstudio::TOKEN_ENV,
            labelstudio::EMAIL_ENV,
            labelstudio::PASSWORD_ENV,
        ],
        _ => &[],
    }
}

/// Whether a platform's credentials are present in the environment.
pub fn credentials_present(platform: &str) -> bool {
    let set = |name: &str| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);

    match platform {
        "appen" => set(appen::EMAIL_ENV) && set(appen::PASSWORD_ENV),
        "toloka" => set(toloka::EMAIL_ENV) && set(toloka::PASSWORD_ENV),
        "labelstudio" => {
            set(labelstudio::TOKEN_ENV)
                || (set(labelstudio::EMAIL_ENV) && set(labelstudio::PASSWORD_ENV))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_no_adapters_for_disabled_platforms() {
        let config = Config::default();
        assert!(build_adapters(&config).is_empty());
    }

    #[test]
    fn test_adapter_order_is_fixed() {
        let toml_str = r#"
            [platforms.labelstudio]
            enabled = true
            base_url = "http://localhost:8080"

            [platforms.appen]
            enabled = true
            base_url = "https://account.example.com"
        "#;
        let config: Config = toml::from_str(toml_str).expect("config parses");

        let adapters = build_adapters(&config);
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["appen", "labelstudio"]);
    }

    #[test]
    fn test_credential_env_vars_known_platforms() {
        assert_eq!(
            credential_env_vars("appen"),
            &["APPEN_EMAIL", "APPEN_PASSWORD"]
        );
        assert!(credential_env_vars("unknown").is_empty());
    }
}
