//! Scanner output parsers.
//!
//! Parsing never fails the caller: a document that cannot be decoded is
//! logged and yields no reports.

pub mod scan_report;

pub use scan_report::parse;
