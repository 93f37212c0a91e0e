//! Advisory validation for configured targets.
//!
//! URLs are validated for real at probe time; these checks only exist so a
//! typo in the config file is pointed out at load time instead of showing
//! up as a permanently-down target with a cryptic diagnostic.

use tracing::warn;
use url::Url;

use crate::monitoring::types::Target;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }
}

/// Validate HTTP/HTTPS URL endpoint
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("Target cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate target display name
pub fn validate_target_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return ValidationResult::err("Name cannot be empty");
    }

    if trimmed.len() > 100 {
        return ValidationResult::err("Name too long (max 100 characters)");
    }

    ValidationResult::ok()
}

/// Log a warning for each problem in a configured target. Never rejects.
pub fn warn_on_suspect_target(target: &Target) {
    let name_check = validate_target_name(&target.name);
    if let Some(error) = name_check.error {
        warn!(url = %target.url, %error, "configured target has a suspect name");
    }

    let url_check = validate_http_endpoint(&target.url);
    if let Some(error) = url_check.error {
        warn!(name = %target.name, url = %target.url, %error, "configured target has a suspect URL");
    }
}
