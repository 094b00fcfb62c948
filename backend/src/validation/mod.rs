//! Schema check at normalizer entry.
//!
//! Header names are trimmed once here; every later column access goes
//! through the indices this module hands out, so there is a single place
//! that decides whether a designated column exists.
//!
//! # Example
//!
//! ```rust,ignore
//! use trendrank::validation::{ColumnPresence, Schema};
//!
//! let schema = Schema::from_headers(&[" 날짜".to_string(), "평균기온(℃) ".to_string()]);
//! assert_eq!(schema.locate("날짜"), ColumnPresence::Present(0));
//! assert!(schema.require("최고기온").is_err());
//! ```

use crate::error::SchemaError;

/// Whether a designated column is in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPresence {
    Present(usize),
    Absent,
}

impl ColumnPresence {
    pub fn index(self) -> Option<usize> {
        match self {
            ColumnPresence::Present(i) => Some(i),
            ColumnPresence::Absent => None,
        }
    }
}

/// Trimmed column names of a loaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn from_headers(headers: &[String]) -> Self {
        Self {
            columns: headers.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of `name` (compared trimmed). The first match wins on
    /// duplicate headers.
    pub fn locate(&self, name: &str) -> ColumnPresence {
        let wanted = name.trim();
        self.columns
            .iter()
            .position(|c| c == wanted)
            .map(ColumnPresence::Present)
            .unwrap_or(ColumnPresence::Absent)
    }

    /// Index of `name`, or `MissingRequiredColumn`.
    pub fn require(&self, name: &str) -> Result<usize, SchemaError> {
        self.locate(name)
            .index()
            .ok_or_else(|| SchemaError::MissingRequiredColumn {
                column: name.trim().to_string(),
                available: self.columns.clone(),
            })
    }

    /// Indices of all `names`, failing on the first absent one.
    pub fn require_all(&self, names: &[&str]) -> Result<Vec<usize>, SchemaError> {
        names.iter().map(|name| self.require(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(headers: &[&str]) -> Schema {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        Schema::from_headers(&headers)
    }

    #[test]
    fn test_headers_are_trimmed() {
        let s = schema(&[" 지점", "\t날짜 ", "평균기온(℃)  "]);
        assert_eq!(s.columns(), &["지점", "날짜", "평균기온(℃)"]);
        assert_eq!(s.locate("날짜"), ColumnPresence::Present(1));
        assert_eq!(s.locate(" 평균기온(℃) "), ColumnPresence::Present(2));
    }

    #[test]
    fn test_absent_column() {
        let s = schema(&["지점", "평균기온(℃)"]);
        assert_eq!(s.locate("날짜"), ColumnPresence::Absent);

        let err = s.require("날짜").unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingRequiredColumn {
                column: "날짜".into(),
                available: vec!["지점".into(), "평균기온(℃)".into()],
            }
        );
    }

    #[test]
    fn test_require_all() {
        let s = schema(&["Country", "INTJ-A", "INTJ-T"]);
        assert_eq!(s.require_all(&["INTJ-T", "Country"]).unwrap(), vec![2, 0]);

        let err = s.require_all(&["Country", "INFP-A", "INFP-T"]).unwrap_err();
        assert!(err.to_string().contains("INFP-A"));
    }

    #[test]
    fn test_duplicate_headers_first_wins() {
        let s = schema(&["a", "b", "a"]);
        assert_eq!(s.locate("a"), ColumnPresence::Present(0));
    }
}
