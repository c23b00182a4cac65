//! List domain model.
//!
//! # Responsibility
//! - Define the list record, its embedded entries and request payloads.
//! - Provide the id-keyed hydration used by direct list reads.
//!
//! # Invariants
//! - `name` is non-blank for every persisted list (`List::validate`).
//! - Entry quantities, when present, are finite and `>= 0`.
//! - Hydrated entries never carry a missing id.
//! - `shared_with` may contain duplicates; they carry no extra meaning.

use super::blank_as_none;
use super::item::{sanitize_item_fields, Item, ItemFields, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a list.
pub type ListId = Uuid;

/// Opaque caller identity supplied by the authentication gate.
pub type UserId = String;

/// Validation errors for list records.
#[derive(Debug, Clone, PartialEq)]
pub enum ListValidationError {
    /// `name` is empty or whitespace only.
    BlankName,
    /// Entry at `position` has a negative or non-finite quantity.
    InvalidQuantity { position: usize, quantity: f64 },
}

impl Display for ListValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "list name must not be blank"),
            Self::InvalidQuantity { position, quantity } => write!(
                f,
                "entry {position} has invalid quantity {quantity}; expected a number >= 0"
            ),
        }
    }
}

impl Error for ListValidationError {}

/// Reference from a list to an item, with the wanted quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

impl ListEntry {
    pub fn new(id: ItemId, quantity: Option<f64>) -> Self {
        Self {
            id: Some(id),
            quantity,
        }
    }
}

/// Entry merged with the descriptive fields of the item it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedEntry {
    #[serde(rename = "_id")]
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Empty when the referenced item no longer exists.
    #[serde(flatten)]
    pub item: ItemFields,
}

/// Named, owned collection of item references.
///
/// `E` is the entry shape: plain references for stored lists,
/// [`HydratedEntry`] for direct reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List<E = ListEntry> {
    #[serde(rename = "_id", alias = "id")]
    pub id: ListId,
    pub name: String,
    /// Owning user. Rewritten to the caller on every full update.
    pub author: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix epoch milliseconds. Descriptive only, never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<i64>,
    #[serde(default)]
    pub items: Vec<E>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
    /// Unix epoch milliseconds, maintained by the store.
    #[serde(default)]
    pub created_at: i64,
    /// Unix epoch milliseconds, maintained by the store.
    #[serde(default)]
    pub updated_at: i64,
}

/// List as returned by a direct read: entries carry item fields.
pub type HydratedList = List<HydratedEntry>;

impl<E> List<E> {
    /// Returns whether `user` is the author or a `shared_with` member.
    pub fn is_visible_to(&self, user: &str) -> bool {
        self.author == user || self.is_shared_with(user)
    }

    pub fn is_shared_with(&self, user: &str) -> bool {
        self.shared_with.iter().any(|member| member == user)
    }
}

impl List {
    /// Creates an unsaved list with a generated id and no entries.
    pub fn new(author: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            author: author.into(),
            description: None,
            close_date: None,
            items: Vec::new(),
            shared_with: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Checks the invariants the store enforces before any write.
    pub fn validate(&self) -> Result<(), ListValidationError> {
        if self.name.trim().is_empty() {
            return Err(ListValidationError::BlankName);
        }

        for (position, entry) in self.items.iter().enumerate() {
            if let Some(quantity) = entry.quantity {
                if !quantity.is_finite() || quantity < 0.0 {
                    return Err(ListValidationError::InvalidQuantity { position, quantity });
                }
            }
        }

        Ok(())
    }

    /// Returns whether any entry references `item_id`.
    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.items.iter().any(|entry| entry.id == Some(item_id))
    }

    /// Ids of entries that carry one, in list order.
    pub fn referenced_item_ids(&self) -> Vec<ItemId> {
        self.items.iter().filter_map(|entry| entry.id).collect()
    }

    /// Drops entries without an id and merges each remaining entry with the
    /// item carrying the same id.
    ///
    /// `items` may come back from the store in any order; entries whose item
    /// is missing keep only their id and quantity.
    pub fn hydrate(self, items: Vec<Item>) -> HydratedList {
        let fields_by_id: HashMap<ItemId, ItemFields> =
            items.into_iter().map(|item| (item.id, item.fields)).collect();

        let entries = self
            .items
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id?;
                Some(HydratedEntry {
                    id,
                    quantity: entry.quantity,
                    item: fields_by_id.get(&id).cloned().unwrap_or_default(),
                })
            })
            .collect();

        List {
            id: self.id,
            name: self.name,
            author: self.author,
            description: self.description,
            close_date: self.close_date,
            items: entries,
            shared_with: self.shared_with,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Payload for creating a list. The author always comes from the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub close_date: Option<i64>,
    #[serde(default)]
    pub items: Vec<ListEntry>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
}

impl NewList {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn into_list(self, author: impl Into<UserId>) -> List {
        let mut list = List::new(author, self.name);
        list.description = self.description;
        list.close_date = self.close_date;
        list.items = self.items;
        list.shared_with = self.shared_with;
        list
    }
}

/// Payload for a full list update.
///
/// Every field is replaced; absent optional fields fall back to their empty
/// defaults rather than keeping the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReplacement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub items: Vec<ListEntry>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub close_date: Option<i64>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
}

impl ListReplacement {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the name when it is present and non-blank.
    pub fn required_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Payload for adding an item to a list.
///
/// With `id`, the existing item is reused and `fields` are ignored; without
/// it, a new item is created from `fields`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewItemRequest {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "blank_as_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(flatten)]
    pub fields: ItemFields,
}

impl NewItemRequest {
    pub fn existing(id: ItemId, quantity: Option<f64>) -> Self {
        Self {
            id: Some(id),
            quantity,
            fields: ItemFields::new(),
        }
    }

    pub fn new_item(fields: ItemFields, quantity: Option<f64>) -> Self {
        Self {
            id: None,
            quantity,
            fields: sanitize_item_fields(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{List, ListEntry, ListReplacement, ListValidationError, NewItemRequest, NewList};
    use crate::model::item::Item;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn validate_rejects_blank_name() {
        let list = List::new("alice", "   ");
        assert_eq!(list.validate(), Err(ListValidationError::BlankName));
    }

    #[test]
    fn validate_rejects_negative_quantity() {
        let mut list = List::new("alice", "Groceries");
        list.items.push(ListEntry::new(Uuid::new_v4(), Some(1.0)));
        list.items.push(ListEntry::new(Uuid::new_v4(), Some(-1.0)));
        assert!(matches!(
            list.validate(),
            Err(ListValidationError::InvalidQuantity { position: 1, .. })
        ));
    }

    #[test]
    fn hydrate_merges_by_id_regardless_of_item_order() {
        let milk = Item::new(json!({ "name": "Milk" }).as_object().cloned().unwrap());
        let eggs = Item::new(json!({ "name": "Eggs" }).as_object().cloned().unwrap());
        let mut list = List::new("alice", "Groceries");
        list.items.push(ListEntry::new(milk.id, Some(2.0)));
        list.items.push(ListEntry::new(eggs.id, Some(12.0)));

        let hydrated = list.hydrate(vec![eggs.clone(), milk.clone()]);
        assert_eq!(hydrated.items[0].id, milk.id);
        assert_eq!(hydrated.items[0].item.get("name"), Some(&json!("Milk")));
        assert_eq!(hydrated.items[0].quantity, Some(2.0));
        assert_eq!(hydrated.items[1].item.get("name"), Some(&json!("Eggs")));
    }

    #[test]
    fn hydrate_drops_entries_without_id_and_keeps_dangling_ones() {
        let dangling = Uuid::new_v4();
        let mut list = List::new("alice", "Groceries");
        list.items.push(ListEntry {
            id: None,
            quantity: Some(3.0),
        });
        list.items.push(ListEntry::new(dangling, Some(1.0)));

        let hydrated = list.hydrate(Vec::new());
        assert_eq!(hydrated.items.len(), 1);
        assert_eq!(hydrated.items[0].id, dangling);
        assert!(hydrated.items[0].item.is_empty());
    }

    #[test]
    fn entry_with_blank_id_deserializes_as_missing() {
        let entry: ListEntry = serde_json::from_value(json!({ "_id": "  ", "quantity": 1 })).unwrap();
        assert_eq!(entry.id, None);
        assert_eq!(entry.quantity, Some(1.0));
    }

    #[test]
    fn list_serializes_with_wire_field_names() {
        let mut list = List::new("alice", "Groceries");
        list.shared_with.push("bob".to_string());
        list.close_date = Some(1_700_000_000_000);
        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["_id"], json!(list.id.to_string()));
        assert_eq!(value["sharedWith"], json!(["bob"]));
        assert_eq!(value["closeDate"], json!(1_700_000_000_000_i64));
        assert!(value["createdAt"].is_i64());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn quantities_are_floats_and_dates_are_epoch_millis_on_the_wire() {
        let mut list = List::new("alice", "Groceries");
        list.items.push(ListEntry::new(Uuid::new_v4(), Some(2.0)));
        let value = serde_json::to_value(&list).unwrap();
        assert!(value["items"][0]["quantity"].is_f64());
        assert_eq!(value["items"][0]["quantity"], json!(2.0));

        let iso_date = json!({ "name": "Groceries", "closeDate": "2024-05-01T00:00:00.000Z" });
        assert!(serde_json::from_value::<NewList>(iso_date).is_err());
    }

    #[test]
    fn replacement_requires_non_blank_name() {
        assert_eq!(ListReplacement::default().required_name(), None);
        assert_eq!(ListReplacement::named(" ").required_name(), None);
        assert_eq!(ListReplacement::named("Chores").required_name(), Some("Chores"));
    }

    #[test]
    fn new_item_request_splits_id_quantity_and_fields() {
        let existing = Uuid::new_v4();
        let reuse: NewItemRequest =
            serde_json::from_value(json!({ "_id": existing.to_string(), "quantity": 4 })).unwrap();
        assert_eq!(reuse.id, Some(existing));
        assert_eq!(reuse.quantity, Some(4.0));

        let create: NewItemRequest =
            serde_json::from_value(json!({ "name": "Milk", "quantity": 2 })).unwrap();
        assert_eq!(create.id, None);
        assert_eq!(create.fields.get("name"), Some(&json!("Milk")));
        assert!(!create.fields.contains_key("quantity"));
    }

    #[test]
    fn visibility_covers_author_and_members() {
        let mut list = List::new("alice", "Groceries");
        list.shared_with.push("bob".to_string());
        assert!(list.is_visible_to("alice"));
        assert!(list.is_visible_to("bob"));
        assert!(!list.is_visible_to("carol"));
    }
}
