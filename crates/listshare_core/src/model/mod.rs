//! Domain model for shared lists and the items they reference.
//!
//! # Responsibility
//! - Define the list, entry and item records used by core business logic.
//! - Keep the wire shape (`_id`, camelCase fields) next to the types.
//!
//! # Invariants
//! - Lists and items are identified by store-generated UUIDs.
//! - User ids are opaque strings resolved by the authentication gate.
//! - A blank entry id is "missing", never a parse error.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub mod item;
pub mod list;

/// Reads an optional UUID, treating absent, `null` and blank strings as
/// `None`.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
