use listshare_core::db::open_db_in_memory;
use listshare_core::{
    ItemFields, ItemSource, List, ListEntry, ListRepository, ListValidationError, RepoError,
    SqliteListRepository,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn fields(value: serde_json::Value) -> ItemFields {
    value.as_object().cloned().unwrap()
}

#[test]
fn create_and_get_roundtrip_keeps_entry_and_share_order() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let mut list = List::new("alice", "Groceries");
    list.description = Some("weekly".to_string());
    list.close_date = Some(1_700_000_000_000);
    list.items = vec![
        ListEntry::new(second, Some(1.0)),
        ListEntry {
            id: None,
            quantity: None,
        },
        ListEntry::new(first, Some(2.5)),
    ];
    list.shared_with = vec!["carol".to_string(), "bob".to_string(), "bob".to_string()];

    let id = repo.create_list(&list).unwrap();
    let loaded = repo.get_list(id).unwrap().unwrap();

    assert_eq!(loaded.name, "Groceries");
    assert_eq!(loaded.author, "alice");
    assert_eq!(loaded.description.as_deref(), Some("weekly"));
    assert_eq!(loaded.close_date, Some(1_700_000_000_000));
    assert_eq!(loaded.items, list.items);
    assert_eq!(loaded.shared_with, list.shared_with);
    assert!(loaded.created_at > 0);
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[test]
fn create_rejects_invalid_list_before_writing() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let blank = List::new("alice", "");
    let err = repo.create_list(&blank).unwrap_err();
    assert!(matches!(err, RepoError::Validation(ListValidationError::BlankName)));
    assert!(repo.get_list(blank.id).unwrap().is_none());
}

#[test]
fn lists_by_author_and_shared_with_filter_independently() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let mut owned = List::new("alice", "Alice list");
    owned.shared_with.push("bob".to_string());
    let bobs = List::new("bob", "Bob list");
    repo.create_list(&owned).unwrap();
    repo.create_list(&bobs).unwrap();

    let alice_owned = repo.lists_by_author("alice").unwrap();
    assert_eq!(alice_owned.len(), 1);
    assert_eq!(alice_owned[0].id, owned.id);

    let bob_owned = repo.lists_by_author("bob").unwrap();
    assert_eq!(bob_owned.len(), 1);
    assert_eq!(bob_owned[0].id, bobs.id);

    let bob_shared = repo.lists_shared_with("bob").unwrap();
    assert_eq!(bob_shared.len(), 1);
    assert_eq!(bob_shared[0].id, owned.id);
    assert!(repo.lists_shared_with("alice").unwrap().is_empty());
}

#[test]
fn replace_list_rewrites_everything_and_reports_missing_ids() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let mut list = List::new("alice", "Groceries");
    list.items.push(ListEntry::new(Uuid::new_v4(), Some(1.0)));
    list.shared_with.push("bob".to_string());
    repo.create_list(&list).unwrap();

    let mut replacement = List::new("bob", "Hardware");
    replacement.id = list.id;
    replacement.description = Some(String::new());
    repo.replace_list(&replacement).unwrap();

    let loaded = repo.get_list(list.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Hardware");
    assert_eq!(loaded.author, "bob");
    assert_eq!(loaded.description.as_deref(), Some(""));
    assert!(loaded.items.is_empty());
    assert!(loaded.shared_with.is_empty());

    let missing = List::new("bob", "Ghost");
    let err = repo.replace_list(&missing).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(id) if id == missing.id));
}

#[test]
fn delete_list_keeps_items_and_reports_missing_ids() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();
    let item = repo
        .push_item(list.id, ItemSource::New(fields(json!({ "name": "Milk" }))), Some(1.0))
        .unwrap();

    repo.delete_list(list.id).unwrap();
    assert!(repo.get_list(list.id).unwrap().is_none());
    assert!(repo.get_item(item.id).unwrap().is_some());

    let err = repo.delete_list(list.id).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(_)));
}

#[test]
fn push_item_creates_or_reuses_items_and_appends_entries() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();

    let created = repo
        .push_item(
            list.id,
            ItemSource::New(fields(json!({ "name": "Milk", "quantity": 9 }))),
            Some(2.0),
        )
        .unwrap();
    assert_eq!(created.fields.get("name"), Some(&json!("Milk")));
    assert!(!created.fields.contains_key("quantity"));

    let reused = repo
        .push_item(list.id, ItemSource::Existing(created.id), Some(3.0))
        .unwrap();
    assert_eq!(reused.id, created.id);

    let loaded = repo.get_list(list.id).unwrap().unwrap();
    assert_eq!(
        loaded.items,
        vec![
            ListEntry::new(created.id, Some(2.0)),
            ListEntry::new(created.id, Some(3.0)),
        ]
    );
    let item_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(item_rows, 1);
}

#[test]
fn push_item_to_missing_list_rolls_back_item_creation() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let err = repo
        .push_item(missing, ItemSource::New(fields(json!({ "name": "Milk" }))), None)
        .unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(id) if id == missing));

    let item_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(item_rows, 0);
}

#[test]
fn push_item_with_unknown_item_id_fails_without_entry() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();

    let unknown = Uuid::new_v4();
    let err = repo
        .push_item(list.id, ItemSource::Existing(unknown), Some(1.0))
        .unwrap_err();
    assert!(matches!(err, RepoError::ItemNotFound(id) if id == unknown));
    assert!(repo.get_list(list.id).unwrap().unwrap().items.is_empty());
}

#[test]
fn push_item_rejects_negative_quantity() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();

    let err = repo
        .push_item(list.id, ItemSource::New(fields(json!({ "name": "Milk" }))), Some(-2.0))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ListValidationError::InvalidQuantity { .. })
    ));
}

#[test]
fn pull_item_collects_item_only_when_unreferenced() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let groceries = List::new("alice", "Groceries");
    let party = List::new("alice", "Party");
    repo.create_list(&groceries).unwrap();
    repo.create_list(&party).unwrap();

    let milk = repo
        .push_item(groceries.id, ItemSource::New(fields(json!({ "name": "Milk" }))), Some(1.0))
        .unwrap();
    repo.push_item(party.id, ItemSource::Existing(milk.id), Some(4.0))
        .unwrap();
    assert_eq!(repo.count_item_references(milk.id).unwrap(), 2);

    let first = repo.pull_item(groceries.id, milk.id).unwrap();
    assert_eq!(first.entries_removed, 1);
    assert!(!first.item_collected);
    assert!(repo.get_item(milk.id).unwrap().is_some());

    let second = repo.pull_item(party.id, milk.id).unwrap();
    assert_eq!(second.entries_removed, 1);
    assert!(second.item_collected);
    assert!(repo.get_item(milk.id).unwrap().is_none());
    assert_eq!(repo.count_item_references(milk.id).unwrap(), 0);
}

#[test]
fn pull_item_removes_duplicate_entries_and_reports_missing_list() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();

    let milk = repo
        .push_item(list.id, ItemSource::New(fields(json!({ "name": "Milk" }))), Some(1.0))
        .unwrap();
    repo.push_item(list.id, ItemSource::Existing(milk.id), Some(2.0))
        .unwrap();

    let removal = repo.pull_item(list.id, milk.id).unwrap();
    assert_eq!(removal.entries_removed, 2);
    assert!(removal.item_collected);

    let err = repo.pull_item(Uuid::new_v4(), milk.id).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(_)));
}

#[test]
fn get_items_returns_only_existing_items() {
    let conn = setup();
    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let list = List::new("alice", "Groceries");
    repo.create_list(&list).unwrap();

    let milk = repo
        .push_item(list.id, ItemSource::New(fields(json!({ "name": "Milk" }))), None)
        .unwrap();
    let eggs = repo
        .push_item(list.id, ItemSource::New(fields(json!({ "name": "Eggs" }))), None)
        .unwrap();

    let mut found = repo
        .get_items(&[eggs.id, Uuid::new_v4(), milk.id, eggs.id])
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect::<Vec<_>>();
    found.sort();
    let mut expected = vec![milk.id, eggs.id];
    expected.sort();
    assert_eq!(found, expected);
    assert!(repo.get_items(&[]).unwrap().is_empty());
}

#[test]
fn corrupted_item_fields_are_reported_as_invalid_data() {
    let conn = setup();
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO items (id, fields) VALUES (?1, 'not json');",
        [id.to_string()],
    )
    .unwrap();

    let repo = SqliteListRepository::try_new(&conn).unwrap();
    let err = repo.get_item(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn try_new_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteListRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("lists")));
}
