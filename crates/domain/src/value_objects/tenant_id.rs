//! Tenant identifier value object
//!
//! # Examples
//!
//! ```
//! use domain::TenantId;
//!
//! let tenant_id = TenantId::new(2);
//! assert_eq!(tenant_id.value(), 2);
//!
//! // Claims carry the tenant as text
//! let parsed = TenantId::parse(" 3 ").unwrap();
//! assert_eq!(parsed, TenantId::new(3));
//! ```

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

/// Integer identifier of a tenant
///
/// Every tenant-owned row carries exactly one `TenantId`; it is the value the
/// isolation predicate compares against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TenantId(i32);

impl TenantId {
    /// Wrap a raw tenant number
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Parse a tenant ID from text, ignoring surrounding whitespace
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::TenantId;
    ///
    /// assert!(TenantId::parse("1").is_ok());
    /// assert!(TenantId::parse("one").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, ParseIntError> {
        s.trim().parse::<i32>().map(Self)
    }

    /// Get the raw tenant number
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<i32> for TenantId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<TenantId> for i32 {
    fn from(id: TenantId) -> Self {
        id.0
    }
}
