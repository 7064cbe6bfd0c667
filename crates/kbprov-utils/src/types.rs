//! Shared domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProvisionError;

/// Minimum length accepted by the collection naming rules
const MIN_PREFIX_LEN: usize = 3;

/// Maximum length accepted by the collection naming rules
const MAX_PREFIX_LEN: usize = 32;

/// Caller-supplied name that namespaces one provisioning chain.
///
/// Every remote resource name and every state-store key derives from it, so it
/// must satisfy the strictest naming rule among them: the collection name
/// (3-32 characters, lowercase letters, digits and hyphens, starting with a
/// letter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPrefix(String);

impl LogicalPrefix {
    /// Validate and wrap a prefix
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::InvalidRequest` when the value violates the
    /// collection naming rules.
    pub fn new(value: impl Into<String>) -> Result<Self, ProvisionError> {
        let value = value.into();
        let len = value.len();
        if !(MIN_PREFIX_LEN..=MAX_PREFIX_LEN).contains(&len) {
            return Err(ProvisionError::InvalidRequest(format!(
                "prefix '{value}' must be {MIN_PREFIX_LEN}-{MAX_PREFIX_LEN} characters"
            )));
        }
        if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(ProvisionError::InvalidRequest(format!(
                "prefix '{value}' must start with a lowercase letter"
            )));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ProvisionError::InvalidRequest(format!(
                "prefix '{value}' contains invalid character '{bad}'"
            )));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Policy resource pattern for the collection: `collection/{prefix}`
    #[must_use]
    pub fn collection_resource(&self) -> String {
        format!("collection/{}", self.0)
    }

    /// Policy resource pattern for every index in the collection: `index/{prefix}/*`
    #[must_use]
    pub fn index_resource(&self) -> String {
        format!("index/{}/*", self.0)
    }

    /// Name of the vector field in the index mapping: `{prefix}-vector`
    #[must_use]
    pub fn vector_field(&self) -> String {
        format!("{}-vector", self.0)
    }
}

impl fmt::Display for LogicalPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalPrefix {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalPrefix> for String {
    fn from(prefix: LogicalPrefix) -> Self {
        prefix.0
    }
}

impl AsRef<str> for LogicalPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derived_names() {
        let prefix = LogicalPrefix::new("acme").unwrap();
        assert_eq!(prefix.as_str(), "acme");
        assert_eq!(prefix.collection_resource(), "collection/acme");
        assert_eq!(prefix.index_resource(), "index/acme/*");
        assert_eq!(prefix.vector_field(), "acme-vector");
    }

    #[test]
    fn rejects_invalid_prefixes() {
        for bad in ["", "ab", "Acme", "1acme", "acme/kb", "acme_kb", &"a".repeat(33)] {
            assert!(
                LogicalPrefix::new(bad).is_err(),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: LogicalPrefix = serde_json::from_str("\"kb-samples\"").unwrap();
        assert_eq!(ok.as_str(), "kb-samples");
        assert!(serde_json::from_str::<LogicalPrefix>("\"Bad Prefix\"").is_err());
    }

    proptest! {
        #[test]
        fn valid_prefixes_round_trip(value in "[a-z][a-z0-9-]{2,31}") {
            let prefix = LogicalPrefix::new(value.clone()).unwrap();
            prop_assert_eq!(prefix.as_str(), value.as_str());
            prop_assert!(prefix.vector_field().starts_with(&value));
        }
    }
}
