//! Severity-filtered vulnerability queries.

use crate::db::ScanReader;
use crate::errors::AppError;
use crate::models::vulnerability::VulnerabilityRecord;

/// Vulnerabilities matching `severity` exactly, or all of them when the
/// filter is absent or empty, each with its risk factors attached.
///
/// A failed risk-factor lookup is logged and leaves that vulnerability with
/// no risk factors; only the main read can fail the query.
pub async fn query_by_severity<R: ScanReader>(
    store: &R,
    severity: Option<&str>,
) -> Result<Vec<VulnerabilityRecord>, AppError> {
    let severity = severity.filter(|s| !s.is_empty());

    let rows = store.query_vulnerabilities(severity).await.map_err(|e| {
        tracing::error!(error = %e, "Executing vulnerability query");
        AppError::Database(e)
    })?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let risk_factors = match store.risk_factors(&row.scan_id, &row.id).await {
            Ok(risk_factors) => risk_factors,
            Err(e) => {
                tracing::warn!(
                    vulnerability_id = %row.id,
                    scan_id = %row.scan_id,
                    error = %e,
                    "Retrieving risk factors failed"
                );
                Vec::new()
            }
        };
        records.push(VulnerabilityRecord::from_row(row, risk_factors));
    }

    tracing::info!(severity = ?severity, count = records.len(), "Query by severity");
    Ok(records)
}
