//! Strongly-typed identifiers.
//!
//! Identifiers are issued by external systems (the identity service, the
//! hosted data store) and are treated as opaque strings at this layer.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier of a user, as issued by the identity service.
///
/// A profile row shares the id of the identity user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier of a student record in the data store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

macro_rules! impl_opaque_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl PartialEq<str> for $t {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl FromStr for $t {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(AppError::validation(format!("{}: empty identifier", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_opaque_id!(UserId, "UserId");
impl_opaque_id!(StudentId, "StudentId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_empty() {
        let id: UserId = "  abc-123 ".parse().unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert!(" ".parse::<UserId>().is_err());
    }

    #[test]
    fn compares_with_raw_str() {
        let id = UserId::new("u-1");
        assert!(id == *"u-1");
        assert!(id != *"u-2");
    }
}
