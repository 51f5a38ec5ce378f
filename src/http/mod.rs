//! Admin API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned and propagated)
//!     → auth.rs (bearer token check on /api routes)
//!     → handlers.rs (JSON in, DomainService call, JSON out)
//!     → response.rs (PanelError → status code + JSON body)
//! ```
//!
//! # Design Decisions
//! - Handlers stay thin; all domain rules live in `DomainService`
//! - Domain operations run detached so a dropped client connection never
//!   cancels an activation halfway

pub mod auth;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{build_router, AdminServer, AppState, ServerError};
