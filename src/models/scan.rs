//! Scan report model as decoded from scanner output and returned by `/scan`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::null_as_default;

use crate::models::vulnerability::Vulnerability;

/// Severity keys expected in `summary.severity_counts`.
pub const SEVERITY_COUNT_KEYS: [&str; 4] = ["Critical", "High", "Medium", "Low"];

/// Element of an input document: one report under the `scanResults` key.
#[derive(Debug, Deserialize)]
pub struct ScanReportWrapper {
    #[serde(rename = "scanResults", default, deserialize_with = "null_as_default")]
    pub scan_results: ScanReport,
}

/// Normalized scan report, keyed by `scan_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(rename = "scan_status", default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub summary: Option<ScanSummary>,
    #[serde(rename = "scan_metadata", default)]
    pub metadata: Option<ScanMetadata>,
    /// File the report was parsed from. Provenance only; never persisted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_file: String,
}

/// Aggregate counts for a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_vulnerabilities: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity_counts: BTreeMap<String, i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixable_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compliant: bool,
}

impl ScanSummary {
    /// Count for one severity key; absent keys count as zero.
    pub fn count_for(&self, severity: &str) -> i64 {
        self.severity_counts.get(severity).copied().unwrap_or(0)
    }
}

/// Scanner and policy information for a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scanner_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scanning_rules: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub excluded_paths: Vec<String>,
}

/// Row of the `scan_results` table.
#[derive(Debug, Clone, FromRow)]
pub struct ScanHeader {
    pub scan_id: String,
    pub timestamp: String,
    pub scan_status: String,
    pub resource_type: String,
    pub resource_name: String,
}

impl ScanHeader {
    /// Reassemble a full report around this header.
    pub fn into_report(
        self,
        vulnerabilities: Vec<Vulnerability>,
        summary: Option<ScanSummary>,
        metadata: Option<ScanMetadata>,
    ) -> ScanReport {
        ScanReport {
            scan_id: self.scan_id,
            timestamp: self.timestamp,
            status: self.scan_status,
            resource_type: self.resource_type,
            resource_name: self.resource_name,
            vulnerabilities,
            summary,
            metadata,
            source_file: String::new(),
        }
    }
}
