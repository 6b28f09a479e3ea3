//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every service has at least one endpoint, and every endpoint is a URL
//! - Validate value ranges (intervals > 0, thresholds > 0)
//! - Detect duplicate chain ids within a service kind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FailoverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{FailoverConfig, SwitcherSettings, TrackerPolicyConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{service} chain {chain_id}: endpoint list is empty")]
    NoEndpoints { service: &'static str, chain_id: u64 },

    #[error("{service} chain {chain_id}: invalid endpoint URL '{url}'")]
    InvalidUrl {
        service: &'static str,
        chain_id: u64,
        url: String,
    },

    #[error("{service} chain {chain_id}: configured more than once")]
    DuplicateChain { service: &'static str, chain_id: u64 },

    #[error("{scope}: {field} must be greater than zero")]
    Zero { scope: String, field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FailoverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_policy("tracker", &config.tracker, &mut errors);
    check_switcher(&config.switcher, &mut errors);

    let mut seen = HashSet::new();
    for rpc in &config.rpc {
        check_service("rpc", rpc.chain_id, &rpc.endpoints, &mut seen, &mut errors);
        if let Some(policy) = &rpc.policy {
            check_policy(&format!("rpc chain {}", rpc.chain_id), policy, &mut errors);
        }
    }

    let mut seen = HashSet::new();
    for oracle in &config.oracle {
        check_service("oracle", oracle.chain_id, &oracle.endpoints, &mut seen, &mut errors);
        if let Some(policy) = &oracle.policy {
            check_policy(&format!("oracle chain {}", oracle.chain_id), policy, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_service(
    service: &'static str,
    chain_id: u64,
    endpoints: &[String],
    seen: &mut HashSet<u64>,
    errors: &mut Vec<ValidationError>,
) {
    if !seen.insert(chain_id) {
        errors.push(ValidationError::DuplicateChain { service, chain_id });
    }
    if endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints { service, chain_id });
    }
    for url in endpoints {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                service,
                chain_id,
                url: url.clone(),
            });
        }
    }
}

fn check_policy(scope: &str, policy: &TrackerPolicyConfig, errors: &mut Vec<ValidationError>) {
    let fields = [
        ("check_interval_ms", policy.check_interval_ms),
        ("probe_timeout_ms", policy.probe_timeout_ms),
        ("ban_duration_ms", policy.ban_duration_ms),
        (
            "consecutive_failure_threshold",
            u64::from(policy.consecutive_failure_threshold),
        ),
    ];
    for (field, value) in fields {
        if value == 0 {
            errors.push(ValidationError::Zero {
                scope: scope.to_string(),
                field,
            });
        }
    }
}

fn check_switcher(settings: &SwitcherSettings, errors: &mut Vec<ValidationError>) {
    let fields = [
        ("events_threshold", settings.events_threshold as u64),
        ("fallback_timeout_ms", settings.fallback_timeout_ms),
        ("restore_timeout_ms", settings.restore_timeout_ms),
    ];
    for (field, value) in fields {
        if value == 0 {
            errors.push(ValidationError::Zero {
                scope: "switcher".to_string(),
                field,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{OracleServiceConfig, RpcServiceConfig};

    fn rpc(chain_id: u64, endpoints: &[&str]) -> RpcServiceConfig {
        RpcServiceConfig {
            chain_id,
            endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
            max_block_lag: 5,
            policy: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&FailoverConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FailoverConfig::default();
        config.tracker.consecutive_failure_threshold = 0;
        config.rpc.push(rpc(1, &[]));
        config.rpc.push(rpc(1, &["not a url"]));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NoEndpoints { service: "rpc", chain_id: 1 }));
        assert!(errors.contains(&ValidationError::DuplicateChain { service: "rpc", chain_id: 1 }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidUrl { .. })));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Zero { field: "consecutive_failure_threshold", .. }
        )));
    }

    #[test]
    fn test_same_chain_in_different_services_is_fine() {
        let mut config = FailoverConfig::default();
        config.rpc.push(rpc(42161, &["https://arb1.example.org"]));
        config.oracle.push(OracleServiceConfig {
            chain_id: 42161,
            endpoints: vec!["https://keeper.example.org".to_string()],
            policy: None,
        });
        assert!(validate_config(&config).is_ok());
    }
}
