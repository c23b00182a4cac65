//! Item records referenced by list entries.
//!
//! An item is shared by every list that references it; no list owns it.
//! Its descriptive fields are opaque to core and stored as one JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identifier of an item.
pub type ItemId = Uuid;

/// Opaque descriptive fields of an item (`name`, etc.).
pub type ItemFields = Map<String, Value>;

/// Keys owned by the record itself or by list entries; never stored as
/// descriptive fields.
const RESERVED_FIELD_KEYS: &[&str] = &["_id", "id", "quantity", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id", alias = "id")]
    pub id: ItemId,
    #[serde(flatten)]
    pub fields: ItemFields,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl Item {
    /// Builds an unsaved item with a fresh id; reserved keys are dropped.
    pub fn new(fields: ItemFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields: sanitize_item_fields(fields),
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Removes keys that belong to the record or to list entries.
pub fn sanitize_item_fields(mut fields: ItemFields) -> ItemFields {
    fields.retain(|key, _| !RESERVED_FIELD_KEYS.contains(&key.as_str()));
    fields
}
