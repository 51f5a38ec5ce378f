//! Hosting panel domain provisioning.
//!
//! Creates, deletes and secures virtual-hosted sites on a reverse proxy:
//! validate the name, provision the document root, stage the vhost config,
//! swap it in atomically, and roll back if the proxy refuses it.

pub mod activation;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod provision;
pub mod service;
pub mod system;
pub mod vhost;

pub use config::schema::PanelConfig;
pub use error::{CreateFailure, PanelError, Stage};
pub use http::AdminServer;
pub use lifecycle::Shutdown;
pub use service::{DomainService, ReconcileReport};
