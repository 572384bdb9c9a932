//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and address formats.
//! All errors are collected rather than stopping at the first one.

use alloy::primitives::Address;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::IndexerConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &IndexerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chain.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new("chain.rpc_url", "not a valid URL"));
    }
    for (i, failover) in config.chain.failover_urls.iter().enumerate() {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                format!("chain.failover_urls[{}]", i),
                "not a valid URL",
            ));
        }
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be > 0"));
    }
    if config.chain.retry_base_delay_ms > config.chain.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "chain.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }

    if config.scanner.poll_interval_secs == 0 {
        errors.push(ValidationError::new("scanner.poll_interval_secs", "must be > 0"));
    }
    if config.scanner.max_block_attempts == 0 {
        errors.push(ValidationError::new("scanner.max_block_attempts", "must be > 0"));
    }

    for (i, treasury) in config.treasuries.iter().enumerate() {
        if treasury.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                format!("treasuries[{}]", i),
                format!("invalid address '{}'", treasury),
            ));
        }
    }

    if config.metrics.window_days == 0 {
        errors.push(ValidationError::new("metrics.window_days", "must be > 0"));
    }
    if config.metrics.top_recipients == 0 {
        errors.push(ValidationError::new("metrics.top_recipients", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
