//! Domain models and request DTOs.

pub mod request;
pub mod scan;
pub mod vulnerability;

use serde::{Deserialize, Deserializer};

/// Deserialize a field whose JSON value may be `null`, yielding the type's
/// default in that case. Pair with `#[serde(default)]` to also cover absence.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
