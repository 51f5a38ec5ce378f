//! Domain model subsystem.
//!
//! # Data Flow
//! ```text
//! raw user input
//!     → name.rs (normalize, validate, uniqueness)
//!     → DomainName (only constructible through validation)
//!     → record.rs (DomainRecord with TLS state machine)
//!     → store.rs (keyed persistence, consistent with activation order)
//! ```

pub mod name;
pub mod record;
pub mod store;

pub use name::{DomainName, ValidationError};
pub use record::{CertificatePaths, DomainRecord, TlsState};
pub use store::{JsonRecordStore, RecordStore, StoreError};
