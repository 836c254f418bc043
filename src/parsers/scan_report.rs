//! Decoder for scan report documents.
//!
//! A document is a JSON array of `{"scanResults": {...}}` wrappers, one
//! report per element. Each decoded report is stamped with the file it came
//! from.

use crate::models::scan::{ScanReport, ScanReportWrapper};

/// Decode a document into reports, in document order.
///
/// Returns an empty vector when the document is malformed.
pub fn parse(data: &[u8], file_name: &str) -> Vec<ScanReport> {
    match decode(data) {
        Ok(mut reports) => {
            for report in &mut reports {
                report.source_file = file_name.to_string();
            }
            tracing::info!(file = %file_name, count = reports.len(), "Parsed scan reports");
            reports
        }
        Err(e) => {
            tracing::warn!(file = %file_name, error = %e, "Failed to decode scan report document");
            Vec::new()
        }
    }
}

fn decode(data: &[u8]) -> Result<Vec<ScanReport>, serde_json::Error> {
    let wrappers: Vec<ScanReportWrapper> = serde_json::from_slice(data)?;
    Ok(wrappers.into_iter().map(|w| w.scan_results).collect())
}
