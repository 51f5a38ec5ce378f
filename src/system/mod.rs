//! Host tool integration.
//!
//! # Data Flow
//! ```text
//! activator ──▶ proxy.rs (ProxyControl: check_config, reload)
//!                  └─▶ command.rs (argv, no shell, kill on drop)
//! service   ──▶ certs.rs (CertificateAuthority: issue)
//!                  └─▶ command.rs (certbot)
//! ```
//!
//! # Design Decisions
//! - Every external tool sits behind a trait so the pipeline can run
//!   against fakes
//! - A missing or non-executable binary is a hard error, never a silent
//!   success

pub mod certs;
pub mod command;
pub mod proxy;

pub use certs::{verify_material, CertbotClient, CertificateAuthority, IssuanceError, MaterialError};
pub use proxy::{CommandProxyControl, ControlError, ProxyControl};
