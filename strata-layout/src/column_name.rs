//! Column coordinates: a `(family, qualifier)` pair.

use std::fmt;
use std::str::FromStr;

use strata_result::{Error, Result};

/// Name of a column in a strata table, as a family name and an optional
/// qualifier.
///
/// A missing qualifier denotes a whole family. That form is valid for
/// map-type families (whose qualifiers are free-form and share one value
/// schema) and for coarse lookups such as [`TableLayout::exists`].
///
/// Ordering is lexicographic on `(family, qualifier)`, with the unqualified
/// form sorting before any qualified column of the same family.
///
/// [`TableLayout::exists`]: crate::TableLayout::exists
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnName {
    family: String,
    qualifier: Option<String>,
}

impl ColumnName {
    /// Names a whole family (no qualifier).
    pub fn family_only(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: None,
        }
    }

    /// Names a fully-qualified column.
    pub fn qualified(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// The family component.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// The qualifier component, if present.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Whether this name carries a qualifier.
    pub fn is_fully_qualified(&self) -> bool {
        self.qualifier.is_some()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}:{}", self.family, qualifier),
            None => f.write_str(&self.family),
        }
    }
}

impl FromStr for ColumnName {
    type Err = Error;

    /// Parses `"family"` or `"family:qualifier"`. An empty family is
    /// rejected; an empty qualifier (`"family:"`) denotes the whole family.
    fn from_str(s: &str) -> Result<Self> {
        let (family, qualifier) = match s.split_once(':') {
            Some((family, "")) => (family, None),
            Some((family, qualifier)) => (family, Some(qualifier.to_string())),
            None => (s, None),
        };
        if family.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "Invalid column name: '{s}'."
            )));
        }
        Ok(Self {
            family: family.to_string(),
            qualifier,
        })
    }
}
