//! TLS configuration and certificate loading for the admin listener.

use std::io;
use std::path::Path;
use axum_server::tls_rustls::RustlsConfig;

use crate::domain::CertificatePaths;
use crate::system::verify_material;

/// Load TLS configuration from certificate and key files.
///
/// The PEM material is checked up front so a bad file fails startup with a
/// readable message instead of a handshake error later.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    let paths = CertificatePaths {
        cert_path: cert_path.to_path_buf(),
        key_path: key_path.to_path_buf(),
    };
    verify_material(&paths).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
