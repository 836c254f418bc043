//! Request extractors and middleware shared by the API routes.

pub mod auth;
pub mod concurrency;
pub mod validated_json;
