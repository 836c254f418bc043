//! Business logic services.

pub mod fetcher;
pub mod ingestion;
pub mod query;
pub mod scan;
