//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that managed paths are absolute and do not overlap
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PanelConfig → Result<(), Vec<ConfigValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::PanelConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Dotted field path, e.g. `vhost.live_dir`.
    pub field: &'static str,
    pub message: String,
}

impl ConfigValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &PanelConfig) -> Result<(), Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ConfigValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    let paths: [(&'static str, &Path); 6] = [
        ("sites.web_root", &config.sites.web_root),
        ("vhost.live_dir", &config.vhost.live_dir),
        ("vhost.staging_dir", &config.vhost.staging_dir),
        ("vhost.backup_dir", &config.vhost.backup_dir),
        ("state.records_path", &config.state.records_path),
        ("state.journal_dir", &config.state.journal_dir),
    ];
    for (field, path) in paths {
        if !path.is_absolute() {
            errors.push(ConfigValidationError::new(
                field,
                format!("must be an absolute path, got {}", path.display()),
            ));
        }
    }

    let vhost_dirs: [(&'static str, &Path); 3] = [
        ("vhost.live_dir", &config.vhost.live_dir),
        ("vhost.staging_dir", &config.vhost.staging_dir),
        ("vhost.backup_dir", &config.vhost.backup_dir),
    ];
    for (i, (field, a)) in vhost_dirs.iter().enumerate() {
        for (other, b) in vhost_dirs.iter().skip(i + 1) {
            if a == b {
                errors.push(ConfigValidationError::new(
                    field,
                    format!("must differ from {other}"),
                ));
            }
        }
    }

    let public_dir = &config.sites.public_dir;
    if public_dir.is_empty()
        || public_dir.contains('/')
        || public_dir.contains('\\')
        || public_dir == "."
        || public_dir == ".."
    {
        errors.push(ConfigValidationError::new(
            "sites.public_dir",
            "must be a single path component",
        ));
    }

    if config.vhost.http_port == 0 || config.vhost.https_port == 0 {
        errors.push(ConfigValidationError::new("vhost", "ports must be non-zero"));
    } else if config.vhost.http_port == config.vhost.https_port {
        errors.push(ConfigValidationError::new("vhost.https_port", "must differ from http_port"));
    }

    if config.proxy.check_command.is_empty() {
        errors.push(ConfigValidationError::new("proxy.check_command", "must not be empty"));
    }
    if config.proxy.reload_command.is_empty() {
        errors.push(ConfigValidationError::new("proxy.reload_command", "must not be empty"));
    }
    if config.proxy.timeout_secs == 0 {
        errors.push(ConfigValidationError::new("proxy.timeout_secs", "must be > 0"));
    }

    if config.certificates.enabled {
        if config.certificates.certbot_command.trim().is_empty() {
            errors.push(ConfigValidationError::new("certificates.certbot_command", "must not be empty"));
        }
        if !config.certificates.live_dir.is_absolute() {
            errors.push(ConfigValidationError::new("certificates.live_dir", "must be an absolute path"));
        }
        if config.certificates.timeout_secs == 0 {
            errors.push(ConfigValidationError::new("certificates.timeout_secs", "must be > 0"));
        }
    }

    if config.admin.api_key.trim().is_empty() {
        errors.push(ConfigValidationError::new("admin.api_key", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ConfigValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
