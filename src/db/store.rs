//! Persistence gateway consumed by the ingestion and query services.
//!
//! Writes are idempotent upserts: storing the same key twice leaves one row
//! holding the second write's values. Both traits are implemented by
//! [`SqliteStore`](crate::db::SqliteStore); tests substitute their own.

use std::future::Future;

use crate::models::scan::{ScanHeader, ScanMetadata, ScanReport, ScanSummary};
use crate::models::vulnerability::{Vulnerability, VulnerabilityRow};

/// Per-entity write operations, called in the fixed order the ingestion
/// pipeline persists a report.
pub trait ScanWriter: Send + Sync {
    /// Upsert the `scan_results` row keyed by `scan_id`.
    fn store_scan_header(
        &self,
        report: &ScanReport,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Upsert a vulnerability keyed by `(scan_id, id)`.
    fn store_vulnerability(
        &self,
        scan_id: &str,
        vulnerability: &Vulnerability,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn store_risk_factor(
        &self,
        scan_id: &str,
        vulnerability_id: &str,
        risk_factor: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn store_summary(
        &self,
        scan_id: &str,
        summary: &ScanSummary,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Upsert scanner/policy versions. Rules and excluded paths are stored separately.
    fn store_metadata(
        &self,
        scan_id: &str,
        metadata: &ScanMetadata,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn store_rule(
        &self,
        scan_id: &str,
        rule: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn store_excluded_path(
        &self,
        scan_id: &str,
        path: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

/// Read operations backing `/query` and scan lookup.
pub trait ScanReader: Send + Sync {
    /// All vulnerability rows, or those whose severity matches exactly.
    fn query_vulnerabilities(
        &self,
        severity: Option<&str>,
    ) -> impl Future<Output = Result<Vec<VulnerabilityRow>, sqlx::Error>> + Send;

    fn risk_factors(
        &self,
        scan_id: &str,
        vulnerability_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;

    fn scan_header(
        &self,
        scan_id: &str,
    ) -> impl Future<Output = Result<Option<ScanHeader>, sqlx::Error>> + Send;

    fn scan_vulnerabilities(
        &self,
        scan_id: &str,
    ) -> impl Future<Output = Result<Vec<VulnerabilityRow>, sqlx::Error>> + Send;

    fn scan_summary(
        &self,
        scan_id: &str,
    ) -> impl Future<Output = Result<Option<ScanSummary>, sqlx::Error>> + Send;

    /// Metadata with its scanning rules and excluded paths attached.
    fn scan_metadata(
        &self,
        scan_id: &str,
    ) -> impl Future<Output = Result<Option<ScanMetadata>, sqlx::Error>> + Send;
}
