//! Lookup of a stored scan report by id.

use crate::db::ScanReader;
use crate::errors::AppError;
use crate::models::scan::ScanReport;

/// Reassemble a stored report: header, vulnerabilities with risk factors,
/// summary, and metadata with rules and excluded paths.
pub async fn find_by_id<R: ScanReader>(store: &R, scan_id: &str) -> Result<ScanReport, AppError> {
    let header = store
        .scan_header(scan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Scan {scan_id} not found")))?;

    let rows = store.scan_vulnerabilities(scan_id).await?;
    let mut vulnerabilities = Vec::with_capacity(rows.len());
    for row in rows {
        let risk_factors = match store.risk_factors(scan_id, &row.id).await {
            Ok(risk_factors) => risk_factors,
            Err(e) => {
                tracing::warn!(
                    vulnerability_id = %row.id,
                    scan_id = %scan_id,
                    error = %e,
                    "Retrieving risk factors failed"
                );
                Vec::new()
            }
        };
        let (_, vulnerability) = row.into_parts(risk_factors);
        vulnerabilities.push(vulnerability);
    }

    let summary = store.scan_summary(scan_id).await?;
    let metadata = store.scan_metadata(scan_id).await?;

    Ok(header.into_report(vulnerabilities, summary, metadata))
}
