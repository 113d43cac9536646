//! Sort criteria

use serde::{Deserialize, Serialize};

/// Direction of one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Pick a direction from a "descending?" flag
    #[must_use]
    pub const fn from_descending(desc: bool) -> Self {
        if desc { Self::Descending } else { Self::Ascending }
    }

    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One `(field, direction)` sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriteria {
    pub field_name: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortCriteria {
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_flag() {
        assert_eq!(SortDirection::from_descending(true), SortDirection::Descending);
        assert_eq!(SortDirection::from_descending(false), SortDirection::Ascending);
        assert_eq!(SortDirection::Descending.as_sql(), "DESC");
    }

    #[test]
    fn direction_defaults_to_ascending() {
        let sort: SortCriteria = serde_json::from_str(r#"{"field_name":"Name"}"#).unwrap();
        assert_eq!(sort, SortCriteria::ascending("Name"));
    }
}
