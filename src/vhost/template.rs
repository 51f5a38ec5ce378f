//! Virtual-host config template.
//!
//! # Responsibilities
//! - Render an nginx `server` block for one site
//! - Add an HTTPS server and an HTTP→HTTPS redirect when certificate paths
//!   are supplied, keeping ACME challenges reachable over plain HTTP
//! - Refuse any substituted value that could escape the config syntax
//!
//! # Design Decisions
//! - The template is fixed in code; only names, paths and ports vary
//! - Substituted values are checked here even though `DomainName` is
//!   already validated

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::VhostConfig;
use crate::domain::{CertificatePaths, DomainName};
use crate::vhost::RenderError;

/// First-line prefix identifying configs this panel wrote.
pub const MANAGED_MARKER: &str = "# Managed by hostpanel";

/// Characters with meaning in nginx config syntax or its variable expansion.
const FORBIDDEN: &[char] = &[';', '{', '}', '"', '\'', '$', '#', '\\', '`'];

/// Renders virtual-host configs with fixed ports and alias policy.
#[derive(Debug, Clone)]
pub struct VhostTemplate {
    http_port: u16,
    https_port: u16,
    www_alias: bool,
}

impl VhostTemplate {
    pub fn new(config: &VhostConfig) -> Self {
        Self {
            http_port: config.http_port,
            https_port: config.https_port,
            www_alias: config.www_alias,
        }
    }

    /// Render the config text for `name` serving `root`, with TLS termination
    /// when `tls` is present.
    pub fn render(
        &self,
        name: &DomainName,
        root: &Path,
        tls: Option<&CertificatePaths>,
    ) -> Result<String, RenderError> {
        let host = checked_name(name)?;
        let root = checked_path("document root", root)?;
        let server_names = name.server_names(self.www_alias).join(" ");

        let mut out = String::new();
        let _ = writeln!(out, "{MANAGED_MARKER} for {host}. Local edits are replaced on the next change.");

        match tls {
            None => {
                self.write_http_site(&mut out, &server_names, root);
            }
            Some(cert) => {
                let cert_path = checked_path("certificate", &cert.cert_path)?;
                let key_path = checked_path("private key", &cert.key_path)?;
                self.write_redirect(&mut out, &server_names, root);
                out.push('\n');
                self.write_https_site(&mut out, &server_names, root, cert_path, key_path);
            }
        }

        Ok(out)
    }

    fn write_http_site(&self, out: &mut String, server_names: &str, root: &str) {
        let port = self.http_port;
        let _ = write!(
            out,
            r#"server {{
    listen {port};
    listen [::]:{port};
    server_name {server_names};

    root {root};
    index index.html index.htm;

{acme}
    location / {{
        try_files $uri $uri/ =404;
    }}
}}
"#,
            acme = acme_location(None),
        );
    }

    fn write_redirect(&self, out: &mut String, server_names: &str, root: &str) {
        let port = self.http_port;
        let https_port = self.https_port;
        let target = if https_port == 443 {
            "https://$host$request_uri".to_string()
        } else {
            format!("https://$host:{https_port}$request_uri")
        };
        let _ = write!(
            out,
            r#"server {{
    listen {port};
    listen [::]:{port};
    server_name {server_names};

{acme}
    location / {{
        return 301 {target};
    }}
}}
"#,
            acme = acme_location(Some(root)),
        );
    }

    fn write_https_site(
        &self,
        out: &mut String,
        server_names: &str,
        root: &str,
        cert_path: &str,
        key_path: &str,
    ) {
        let port = self.https_port;
        let _ = write!(
            out,
            r#"server {{
    listen {port} ssl;
    listen [::]:{port} ssl;
    server_name {server_names};

    ssl_certificate {cert_path};
    ssl_certificate_key {key_path};
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_session_cache shared:SSL:10m;

    root {root};
    index index.html index.htm;

    location / {{
        try_files $uri $uri/ =404;
    }}
}}
"#
        );
    }
}

/// Certificate paths referenced by a rendered config, if it terminates TLS.
pub fn certificate_paths_in(text: &str) -> Option<CertificatePaths> {
    let directive = |key: &str| {
        text.lines().find_map(|line| {
            let rest = line.trim().strip_prefix(key)?.strip_prefix(' ')?;
            rest.strip_suffix(';').map(|p| PathBuf::from(p.trim()))
        })
    };
    Some(CertificatePaths {
        cert_path: directive("ssl_certificate")?,
        key_path: directive("ssl_certificate_key")?,
    })
}

fn acme_location(root: Option<&str>) -> String {
    let root_line = root
        .map(|r| format!("        root {r};\n"))
        .unwrap_or_default();
    format!(
        r#"    location ^~ /.well-known/acme-challenge/ {{
{root_line}        default_type "text/plain";
        try_files $uri =404;
    }}
"#
    )
}

fn checked_name(name: &DomainName) -> Result<&str, RenderError> {
    let host = name.as_str();
    let ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    if ok {
        Ok(host)
    } else {
        Err(RenderError::Template(format!("unsafe server name {host:?}")))
    }
}

fn checked_path<'a>(what: &str, path: &'a Path) -> Result<&'a str, RenderError> {
    let text = path
        .to_str()
        .ok_or_else(|| RenderError::Template(format!("{what} path is not valid UTF-8")))?;
    if !path.is_absolute() {
        return Err(RenderError::Template(format!("{what} path {text:?} is not absolute")));
    }
    if text.chars().any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c)) {
        return Err(RenderError::Template(format!("unsafe {what} path {text:?}")));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> VhostTemplate {
        VhostTemplate::new(&VhostConfig::default())
    }

    fn name() -> DomainName {
        DomainName::parse("example.com").unwrap()
    }

    fn cert() -> CertificatePaths {
        CertificatePaths {
            cert_path: PathBuf::from("/etc/letsencrypt/live/example.com/fullchain.pem"),
            key_path: PathBuf::from("/etc/letsencrypt/live/example.com/privkey.pem"),
        }
    }

    #[test]
    fn test_http_config() {
        let text = template()
            .render(&name(), Path::new("/var/www/example.com/public_html"), None)
            .unwrap();

        assert!(text.contains("listen 80;"));
        assert!(text.contains("server_name example.com www.example.com;"));
        assert!(text.contains("root /var/www/example.com/public_html;"));
        assert!(text.contains("/.well-known/acme-challenge/"));
        assert!(!text.contains("ssl_certificate"));
        assert!(!text.contains("return 301"));
        assert_eq!(text.matches('{').count(), text.matches('}').count());
    }

    #[test]
    fn test_tls_config_redirects_and_terminates() {
        let cert = cert();
        let text = template()
            .render(&name(), Path::new("/var/www/example.com/public_html"), Some(&cert))
            .unwrap();

        assert!(text.contains("return 301 https://$host$request_uri;"));
        assert!(text.contains("listen 443 ssl;"));
        assert!(text.contains("ssl_certificate /etc/letsencrypt/live/example.com/fullchain.pem;"));
        assert!(text.contains("ssl_certificate_key /etc/letsencrypt/live/example.com/privkey.pem;"));
        assert_eq!(text.matches("server {").count(), 2);
        assert_eq!(text.matches('{').count(), text.matches('}').count());
    }

    #[test]
    fn test_custom_https_port_in_redirect() {
        let mut config = VhostConfig::default();
        config.https_port = 8443;
        config.www_alias = false;
        let text = VhostTemplate::new(&config)
            .render(&name(), Path::new("/srv/example.com/public_html"), Some(&cert()))
            .unwrap();
        assert!(text.contains("return 301 https://$host:8443$request_uri;"));
        assert!(text.contains("server_name example.com;"));
    }

    #[test]
    fn test_certificate_paths_read_back_from_config() {
        let t = template();
        let root = Path::new("/var/www/example.com/public_html");

        let https = t.render(&name(), root, Some(&cert())).unwrap();
        assert_eq!(certificate_paths_in(&https), Some(cert()));

        let http = t.render(&name(), root, None).unwrap();
        assert_eq!(certificate_paths_in(&http), None);
    }

    #[test]
    fn test_www_name_gets_no_second_prefix() {
        let name = DomainName::parse("www.example.com").unwrap();
        let text = template()
            .render(&name, Path::new("/var/www/www.example.com/public_html"), Some(&cert()))
            .unwrap();

        assert_eq!(text.matches("server_name www.example.com;").count(), 2);
        assert!(!text.contains("www.www."));
    }

    #[test]
    fn test_rejects_injection_in_paths() {
        let t = template();
        for bad in [
            "/var/www/x; include /etc/passwd",
            "/var/www/x}",
            "/var/www/$document_root",
            "/var/www/a b",
            "/var/www/x\nserver {",
            "relative/path",
        ] {
            let err = t.render(&name(), Path::new(bad), None).unwrap_err();
            assert!(matches!(err, RenderError::Template(_)), "accepted {bad:?}");
        }

        let mut cert = cert();
        cert.key_path = PathBuf::from("/etc/ssl/key.pem; ssl_verify off");
        assert!(t
            .render(&name(), Path::new("/var/www/example.com/public_html"), Some(&cert))
            .is_err());
    }
}
