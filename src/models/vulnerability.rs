//! Vulnerability model shared by ingestion, storage, and queries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::null_as_default;

/// A single finding inside a scan report.
///
/// Severity is kept exactly as the scanner supplied it (`Critical`, `HIGH`, ...);
/// filters compare it case-sensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vulnerability {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cvss: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub package_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixed_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub published_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub risk_factors: Vec<String>,
}

/// Row of the `vulnerabilities` table. Risk factors live in their own table.
#[derive(Debug, Clone, FromRow)]
pub struct VulnerabilityRow {
    pub id: String,
    pub scan_id: String,
    pub severity: String,
    pub cvss: f64,
    pub status: String,
    pub package_name: String,
    pub current_version: String,
    pub fixed_version: String,
    pub description: String,
    pub published_date: String,
    pub link: String,
}

impl VulnerabilityRow {
    /// Attach risk factors, producing the owning scan id and the vulnerability.
    pub fn into_parts(self, risk_factors: Vec<String>) -> (String, Vulnerability) {
        let vulnerability = Vulnerability {
            id: self.id,
            severity: self.severity,
            cvss: self.cvss,
            status: self.status,
            package_name: self.package_name,
            current_version: self.current_version,
            fixed_version: self.fixed_version,
            description: self.description,
            published_date: self.published_date,
            link: self.link,
            risk_factors,
        };
        (self.scan_id, vulnerability)
    }
}

/// Vulnerability returned by `/query`, tagged with the scan it was reported in.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VulnerabilityRecord {
    pub scan_id: String,
    #[serde(flatten)]
    pub vulnerability: Vulnerability,
}

impl VulnerabilityRecord {
    pub fn from_row(row: VulnerabilityRow, risk_factors: Vec<String>) -> Self {
        let (scan_id, vulnerability) = row.into_parts(risk_factors);
        Self {
            scan_id,
            vulnerability,
        }
    }
}
