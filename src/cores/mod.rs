// Copyright (c) 2024 Mike Tsao

//! The closed sets of instrument and effect variants, and their parameter
//! records. A core says *what* a node is; the [AudioGraph](crate::traits::AudioGraph)
//! decides how to realize it.

pub use effects::*;
pub use instruments::*;

mod effects;
mod instruments;

/// Deserializes a variant's parameter record from an options object. Missing
/// fields take defaults. An options object that doesn't deserialize is logged
/// and replaced by the defaults.
pub(crate) fn options_or_default<T>(variant: &str, options: Option<&serde_json::Value>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match options {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            log::warn!("ignoring malformed {variant} options {value}: {e}");
            T::default()
        }),
    }
}
