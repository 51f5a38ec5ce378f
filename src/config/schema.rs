//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the panel.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Root configuration for the hosting panel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// Admin API listener (bind address, TLS).
    pub listener: ListenerConfig,

    /// Document root layout.
    pub sites: SitesConfig,

    /// Virtual-host config locations and rendering options.
    pub vhost: VhostConfig,

    /// Panel-owned state (records, activation journal).
    pub state: StateConfig,

    /// Reverse-proxy control commands.
    pub proxy: ProxyControlConfig,

    /// Certificate issuance.
    pub certificates: CertificateConfig,

    /// Admin API authentication.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8090").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Admin API request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8090".to_string(),
            tls: None,
            request_timeout_secs: 300,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Where site content lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Base directory; each site gets `<web_root>/<name>/`.
    pub web_root: PathBuf,

    /// Served sub-directory inside a site directory.
    pub public_dir: String,

    /// Remove the site directory when a domain is deleted.
    pub purge_on_delete: bool,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("/var/www"),
            public_dir: "public_html".to_string(),
            purge_on_delete: true,
        }
    }
}

/// Virtual-host config locations.
///
/// `staging_dir` and `backup_dir` must be on the same filesystem as
/// `live_dir` so that swaps and restores are atomic renames.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VhostConfig {
    /// Directory the proxy includes (`<live_dir>/<name>.conf`).
    pub live_dir: PathBuf,

    /// Directory for rendered-but-inactive configs.
    pub staging_dir: PathBuf,

    /// Directory for the pre-swap copy of a live config.
    pub backup_dir: PathBuf,

    /// Plain HTTP port.
    pub http_port: u16,

    /// HTTPS port used once TLS is active.
    pub https_port: u16,

    /// Also answer for `www.<name>`.
    pub www_alias: bool,
}

impl Default for VhostConfig {
    fn default() -> Self {
        Self {
            live_dir: PathBuf::from("/etc/nginx/sites-enabled"),
            staging_dir: PathBuf::from("/etc/nginx/hostpanel/staging"),
            backup_dir: PathBuf::from("/etc/nginx/hostpanel/backup"),
            http_port: 80,
            https_port: 443,
            www_alias: true,
        }
    }
}

/// Panel-owned state locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    /// JSON file holding domain records.
    pub records_path: PathBuf,

    /// Directory of write-ahead activation markers.
    pub journal_dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("/var/lib/hostpanel/domains.json"),
            journal_dir: PathBuf::from("/var/lib/hostpanel/journal"),
        }
    }
}

/// Reverse-proxy control commands (argv, no shell).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyControlConfig {
    /// Syntax check, e.g. `["nginx", "-t"]`.
    pub check_command: Vec<String>,

    /// Reload, e.g. `["nginx", "-s", "reload"]`.
    pub reload_command: Vec<String>,

    /// Upper bound for a single check or reload call.
    pub timeout_secs: u64,
}

impl Default for ProxyControlConfig {
    fn default() -> Self {
        Self {
            check_command: vec!["nginx".to_string(), "-t".to_string()],
            reload_command: vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()],
            timeout_secs: 30,
        }
    }
}

/// How the CA validates control of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMethod {
    /// HTTP-01 challenge files written into the document root.
    #[default]
    Webroot,
    /// HTTP-01 served by the client's own temporary listener.
    Standalone,
}

/// Certificate issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificateConfig {
    /// Allow `enable_tls` at all.
    pub enabled: bool,

    /// Certbot executable.
    pub certbot_command: String,

    /// Registration contact; empty registers without email.
    pub email: String,

    /// Where certbot places `<name>/fullchain.pem` and `<name>/privkey.pem`.
    pub live_dir: PathBuf,

    pub method: ValidationMethod,

    /// Use the CA's staging environment.
    pub staging: bool,

    /// Upper bound for one issuance attempt.
    pub timeout_secs: u64,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            certbot_command: "certbot".to_string(),
            email: String::new(),
            live_dir: PathBuf::from("/etc/letsencrypt/live"),
            method: ValidationMethod::Webroot,
            staging: false,
            timeout_secs: 180,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// API key for authentication (Bearer token).
    /// Overridden by `HOSTPANEL_API_KEY` when set.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: PanelConfig = toml::from_str(
            r#"
            [sites]
            web_root = "/srv/www"

            [certificates]
            method = "standalone"
            "#,
        )
        .unwrap();

        assert_eq!(config.sites.web_root, PathBuf::from("/srv/www"));
        assert_eq!(config.sites.public_dir, "public_html");
        assert_eq!(config.certificates.method, ValidationMethod::Standalone);
        assert_eq!(config.proxy.reload_command, vec!["nginx", "-s", "reload"]);
        assert_eq!(config.vhost.http_port, 80);
    }
}
