//! SQLite-backed scan store.

use std::collections::BTreeMap;

use sqlx::{FromRow, SqlitePool};

use crate::db::store::{ScanReader, ScanWriter};
use crate::models::scan::{ScanHeader, ScanMetadata, ScanReport, ScanSummary};
use crate::models::vulnerability::{Vulnerability, VulnerabilityRow};

const VULNERABILITY_COLUMNS: &str = "id, scan_id, severity, cvss, status, package_name, \
     current_version, fixed_version, description, published_date, link";

/// Scan store over a shared connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_vulnerabilities: i64,
    critical_count: i64,
    high_count: i64,
    medium_count: i64,
    low_count: i64,
    fixable_count: i64,
    compliant: bool,
}

impl From<SummaryRow> for ScanSummary {
    fn from(row: SummaryRow) -> Self {
        let severity_counts = BTreeMap::from([
            ("Critical".to_string(), row.critical_count),
            ("High".to_string(), row.high_count),
            ("Medium".to_string(), row.medium_count),
            ("Low".to_string(), row.low_count),
        ]);
        Self {
            total_vulnerabilities: row.total_vulnerabilities,
            severity_counts,
            fixable_count: row.fixable_count,
            compliant: row.compliant,
        }
    }
}

impl ScanWriter for SqliteStore {
    async fn store_scan_header(&self, report: &ScanReport) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO scan_results (scan_id, timestamp, scan_status, resource_type, resource_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.scan_id)
        .bind(&report.timestamp)
        .bind(&report.status)
        .bind(&report.resource_type)
        .bind(&report.resource_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_vulnerability(
        &self,
        scan_id: &str,
        vulnerability: &Vulnerability,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO vulnerabilities (
                id, scan_id, severity, cvss, status, package_name,
                current_version, fixed_version, description, published_date, link
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vulnerability.id)
        .bind(scan_id)
        .bind(&vulnerability.severity)
        .bind(vulnerability.cvss)
        .bind(&vulnerability.status)
        .bind(&vulnerability.package_name)
        .bind(&vulnerability.current_version)
        .bind(&vulnerability.fixed_version)
        .bind(&vulnerability.description)
        .bind(&vulnerability.published_date)
        .bind(&vulnerability.link)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_risk_factor(
        &self,
        scan_id: &str,
        vulnerability_id: &str,
        risk_factor: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR REPLACE INTO risk_factors (vulnerability_id, scan_id, risk_factor) VALUES (?, ?, ?)",
        )
        .bind(vulnerability_id)
        .bind(scan_id)
        .bind(risk_factor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_summary(&self, scan_id: &str, summary: &ScanSummary) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO scan_summary (
                scan_id, total_vulnerabilities, critical_count, high_count,
                medium_count, low_count, fixable_count, compliant
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(scan_id)
        .bind(summary.total_vulnerabilities)
        .bind(summary.count_for("Critical"))
        .bind(summary.count_for("High"))
        .bind(summary.count_for("Medium"))
        .bind(summary.count_for("Low"))
        .bind(summary.fixable_count)
        .bind(summary.compliant)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_metadata(
        &self,
        scan_id: &str,
        metadata: &ScanMetadata,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR REPLACE INTO scan_metadata (scan_id, scanner_version, policies_version) VALUES (?, ?, ?)",
        )
        .bind(scan_id)
        .bind(&metadata.scanner_version)
        .bind(&metadata.policies_version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_rule(&self, scan_id: &str, rule: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR REPLACE INTO scanning_rules (scan_id, rule) VALUES (?, ?)")
            .bind(scan_id)
            .bind(rule)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn store_excluded_path(&self, scan_id: &str, path: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR REPLACE INTO excluded_paths (scan_id, path) VALUES (?, ?)")
            .bind(scan_id)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl ScanReader for SqliteStore {
    async fn query_vulnerabilities(
        &self,
        severity: Option<&str>,
    ) -> Result<Vec<VulnerabilityRow>, sqlx::Error> {
        tracing::debug!(severity = ?severity, "Executing vulnerabilities query");
        let rows = match severity {
            Some(severity) => {
                sqlx::query_as::<_, VulnerabilityRow>(&format!(
                    "SELECT {VULNERABILITY_COLUMNS} FROM vulnerabilities WHERE severity = ? ORDER BY scan_id, id"
                ))
                .bind(severity)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, VulnerabilityRow>(&format!(
                    "SELECT {VULNERABILITY_COLUMNS} FROM vulnerabilities ORDER BY scan_id, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn risk_factors(
        &self,
        scan_id: &str,
        vulnerability_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT risk_factor
            FROM risk_factors
            WHERE scan_id = ? AND vulnerability_id = ?
            ORDER BY risk_factor
            "#,
        )
        .bind(scan_id)
        .bind(vulnerability_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn scan_header(&self, scan_id: &str) -> Result<Option<ScanHeader>, sqlx::Error> {
        sqlx::query_as::<_, ScanHeader>(
            r#"
            SELECT scan_id, timestamp, scan_status, resource_type, resource_name
            FROM scan_results
            WHERE scan_id = ?
            "#,
        )
        .bind(scan_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn scan_vulnerabilities(&self, scan_id: &str) -> Result<Vec<VulnerabilityRow>, sqlx::Error> {
        sqlx::query_as::<_, VulnerabilityRow>(&format!(
            "SELECT {VULNERABILITY_COLUMNS} FROM vulnerabilities WHERE scan_id = ? ORDER BY id"
        ))
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn scan_summary(&self, scan_id: &str) -> Result<Option<ScanSummary>, sqlx::Error> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT total_vulnerabilities, critical_count, high_count, medium_count,
                   low_count, fixable_count, compliant
            FROM scan_summary
            WHERE scan_id = ?
            "#,
        )
        .bind(scan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ScanSummary::from))
    }

    async fn scan_metadata(&self, scan_id: &str) -> Result<Option<ScanMetadata>, sqlx::Error> {
        let versions = sqlx::query_as::<_, (String, String)>(
            "SELECT scanner_version, policies_version FROM scan_metadata WHERE scan_id = ?",
        )
        .bind(scan_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((scanner_version, policies_version)) = versions else {
            return Ok(None);
        };

        let scanning_rules = sqlx::query_scalar::<_, String>(
            "SELECT rule FROM scanning_rules WHERE scan_id = ? ORDER BY rule",
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await?;

        let excluded_paths = sqlx::query_scalar::<_, String>(
            "SELECT path FROM excluded_paths WHERE scan_id = ? ORDER BY path",
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ScanMetadata {
            scanner_version,
            policies_version,
            scanning_rules,
            excluded_paths,
        }))
    }
}
