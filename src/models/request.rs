//! Request bodies accepted by the API.

use serde::Deserialize;
use validator::Validate;

/// Body of `POST /scan`.
#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequest {
    /// Repository URL (`http...`) or local directory holding the report files.
    #[validate(length(min = 1, message = "repo must not be empty"))]
    pub repo: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Body of `POST /query`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct QueryRequest {
    #[serde(default)]
    pub filters: QueryFilters,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryFilters {
    #[serde(default)]
    pub severity: Option<String>,
}

impl QueryFilters {
    /// Severity filter, treating an empty string as no filter.
    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref().filter(|s| !s.is_empty())
    }
}
