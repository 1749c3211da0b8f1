// Core data models for the pipeline board

pub mod stage;
pub mod record;
pub mod movement;

pub use stage::*;
pub use record::*;
pub use movement::*;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
/// Combined with `#[serde(default)]`, an absent field stays `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
