//! Network layer subsystem.
//!
//! The admin listener itself is bound in `http::server`; this module only
//! prepares optional TLS for it.

pub mod tls;
