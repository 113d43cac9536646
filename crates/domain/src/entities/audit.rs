//! Creation and last-write provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created and last wrote a row, and when
///
/// Creation fields are set once; later writes only move the last-write pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    #[serde(default)]
    pub track_creation_user: String,
    #[serde(default = "epoch")]
    pub track_creation_time: DateTime<Utc>,
    #[serde(default)]
    pub track_last_write_user: String,
    #[serde(default = "epoch")]
    pub track_last_write_time: DateTime<Utc>,
}

const fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Default for AuditFields {
    fn default() -> Self {
        Self {
            track_creation_user: String::new(),
            track_creation_time: epoch(),
            track_last_write_user: String::new(),
            track_last_write_time: epoch(),
        }
    }
}

impl AuditFields {
    /// Fields of a row created by `identity` at `at`
    pub fn created_by(identity: impl Into<String>, at: DateTime<Utc>) -> Self {
        let identity = identity.into();
        Self {
            track_creation_user: identity.clone(),
            track_creation_time: at,
            track_last_write_user: identity,
            track_last_write_time: at,
        }
    }

    /// Set creation and last-write provenance
    pub fn stamp_created(&mut self, identity: &str, at: DateTime<Utc>) {
        *self = Self::created_by(identity, at);
    }

    /// Set last-write provenance only
    pub fn stamp_modified(&mut self, identity: &str, at: DateTime<Utc>) {
        identity.clone_into(&mut self.track_last_write_user);
        self.track_last_write_time = at;
    }
}
