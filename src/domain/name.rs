//! Domain name validation and normalization.
//!
//! # Responsibilities
//! - Canonicalize user input (trim, lowercase)
//! - Reject anything that is not plain hostname label syntax
//! - Reject names already claimed by another site
//!
//! # Design Decisions
//! - `DomainName` can only be built through `parse`, so every path and config
//!   derived from it downstream is traversal-free by construction
//! - Uniqueness is checked through a caller-supplied predicate to keep the
//!   validator free of I/O

use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a fully qualified name (RFC 1035).
pub const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

/// Errors produced while validating a proposed domain name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is not an acceptable hostname.
    #[error("invalid domain name {input:?}: {reason}")]
    InvalidFormat { input: String, reason: &'static str },

    /// A site with this name already exists.
    #[error("domain {0} already exists")]
    DuplicateDomain(String),
}

impl ValidationError {
    fn invalid(input: &str, reason: &'static str) -> Self {
        ValidationError::InvalidFormat {
            input: input.to_string(),
            reason,
        }
    }
}

/// A validated, normalized host identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Normalize and validate raw input.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::invalid(input, "name is empty"));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(ValidationError::invalid(input, "name exceeds 253 characters"));
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(ValidationError::invalid(input, "name contains a path separator"));
        }
        if trimmed.contains("..") {
            return Err(ValidationError::invalid(input, "name contains an empty label or parent reference"));
        }

        let normalized = trimmed.to_ascii_lowercase();

        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
        {
            tracing::debug!(input = %input, character = ?bad, "Rejected domain character");
            return Err(ValidationError::invalid(input, "name contains characters outside [a-z0-9.-]"));
        }
        if normalized.starts_with('.') || normalized.ends_with('.') {
            return Err(ValidationError::invalid(input, "name has a leading or trailing dot"));
        }

        for label in normalized.split('.') {
            if label.is_empty() {
                return Err(ValidationError::invalid(input, "name contains an empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(ValidationError::invalid(input, "label exceeds 63 characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(ValidationError::invalid(input, "label starts or ends with a hyphen"));
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host names a site answers to. The `www.` alias is added only when
    /// requested and the name does not already carry that prefix.
    pub fn server_names(&self, www_alias: bool) -> Vec<String> {
        let mut names = vec![self.0.clone()];
        if www_alias && !self.0.starts_with("www.") {
            names.push(format!("www.{}", self.0));
        }
        names
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

/// Reject `name` if `is_taken` reports it as already in use.
pub fn ensure_unique(
    name: &DomainName,
    is_taken: impl Fn(&DomainName) -> bool,
) -> Result<(), ValidationError> {
    if is_taken(name) {
        return Err(ValidationError::DuplicateDomain(name.to_string()));
    }
    Ok(())
}

/// Full validation: syntax, normalization, then uniqueness.
pub fn validate(
    input: &str,
    is_taken: impl Fn(&DomainName) -> bool,
) -> Result<DomainName, ValidationError> {
    let name = DomainName::parse(input)?;
    ensure_unique(&name, is_taken)?;
    Ok(name)
}
