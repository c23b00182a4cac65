//! List/item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `lists`, `list_entries`, `list_shares` and
//!   `items`.
//! - Own the two cross-record mutations (item push, item pull with orphan
//!   collection) and run each in a single immediate transaction.
//!
//! # Invariants
//! - Write paths call `List::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Entry order is the `position` order; positions only grow.
//! - Orphan collection is best-effort: its failure never fails a pull.

use crate::db::DbError;
use crate::model::item::{Item, ItemFields, ItemId};
use crate::model::list::{List, ListEntry, ListId, ListValidationError};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite::{Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const LIST_SELECT_SQL: &str = "SELECT
    id,
    name,
    author,
    description,
    close_date,
    created_at,
    updated_at
FROM lists";

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    fields,
    created_at,
    updated_at
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for list and item persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ListValidationError),
    Db(DbError),
    ListNotFound(ListId),
    ItemNotFound(ItemId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted list data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "list store is missing required table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ListValidationError> for RepoError {
    fn from(value: ListValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Where the item of a pushed entry comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSource {
    /// Reuse an item that must already exist.
    Existing(ItemId),
    /// Create a new item from descriptive fields.
    New(ItemFields),
}

/// Outcome of pulling an item from a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRemoval {
    /// Number of entries removed from the list (0 when none matched).
    pub entries_removed: usize,
    /// Whether the item was deleted because no list references it anymore.
    pub item_collected: bool,
}

/// Repository interface for list and item operations.
pub trait ListRepository {
    /// Persists a new list with its entries and shares.
    fn create_list(&self, list: &List) -> RepoResult<ListId>;
    /// Loads one list by id.
    fn get_list(&self, id: ListId) -> RepoResult<Option<List>>;
    /// Lists authored by `author`, newest update first.
    fn lists_by_author(&self, author: &str) -> RepoResult<Vec<List>>;
    /// Lists whose share set contains `user`, newest update first.
    fn lists_shared_with(&self, user: &str) -> RepoResult<Vec<List>>;
    /// Replaces every mutable field, entries and shares of an existing list.
    fn replace_list(&self, list: &List) -> RepoResult<()>;
    /// Permanently removes one list. Items are left alone.
    fn delete_list(&self, id: ListId) -> RepoResult<()>;
    /// Loads one item by id.
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    /// Loads the items with the given ids, in no particular order.
    fn get_items(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>>;
    /// Resolves or creates an item and appends an entry for it, atomically.
    fn push_item(
        &self,
        list_id: ListId,
        source: ItemSource,
        quantity: Option<f64>,
    ) -> RepoResult<Item>;
    /// Removes every entry for `item_id` from a list and deletes the item
    /// when no list references it anymore, atomically.
    fn pull_item(&self, list_id: ListId, item_id: ItemId) -> RepoResult<ItemRemoval>;
    /// Number of distinct lists with at least one entry for `item_id`.
    fn count_item_references(&self, item_id: ItemId) -> RepoResult<usize>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_list_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, list: &List) -> RepoResult<ListId> {
        list.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO lists (
                id,
                name,
                author,
                description,
                close_date
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                list.id.to_string(),
                list.name.as_str(),
                list.author.as_str(),
                list.description.as_deref(),
                list.close_date,
            ],
        )?;
        write_entries(&tx, list.id, &list.items)?;
        write_shares(&tx, list.id, &list.shared_with)?;
        tx.commit()?;

        Ok(list.id)
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<List>> {
        load_list(self.conn, id)
    }

    fn lists_by_author(&self, author: &str) -> RepoResult<Vec<List>> {
        query_lists(
            self.conn,
            &format!("{LIST_SELECT_SQL} WHERE author = ?1 ORDER BY updated_at DESC, id ASC;"),
            author,
        )
    }

    fn lists_shared_with(&self, user: &str) -> RepoResult<Vec<List>> {
        query_lists(
            self.conn,
            &format!(
                "{LIST_SELECT_SQL}
                 WHERE EXISTS (
                    SELECT 1
                    FROM list_shares s
                    WHERE s.list_id = lists.id
                      AND s.user_id = ?1
                 )
                 ORDER BY updated_at DESC, id ASC;"
            ),
            user,
        )
    }

    fn replace_list(&self, list: &List) -> RepoResult<()> {
        list.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE lists
             SET
                name = ?2,
                author = ?3,
                description = ?4,
                close_date = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                list.id.to_string(),
                list.name.as_str(),
                list.author.as_str(),
                list.description.as_deref(),
                list.close_date,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(list.id));
        }

        tx.execute(
            "DELETE FROM list_entries WHERE list_id = ?1;",
            [list.id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM list_shares WHERE list_id = ?1;",
            [list.id.to_string()],
        )?;
        write_entries(&tx, list.id, &list.items)?;
        write_shares(&tx, list.id, &list.shared_with)?;
        tx.commit()?;

        Ok(())
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM lists WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(id));
        }
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        load_item(self.conn, id)
    }

    fn get_items(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>> {
        let unique: BTreeSet<String> = ids.iter().map(ItemId::to_string).collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; unique.len()].join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id IN ({placeholders});"))?;
        let mut rows = stmt.query(params_from_iter(unique.into_iter().map(Value::Text)))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn push_item(
        &self,
        list_id: ListId,
        source: ItemSource,
        quantity: Option<f64>,
    ) -> RepoResult<Item> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !list_exists(&tx, list_id)? {
            return Err(RepoError::ListNotFound(list_id));
        }

        let position = next_entry_position(&tx, list_id)?;
        if let Some(quantity) = quantity {
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(RepoError::Validation(ListValidationError::InvalidQuantity {
                    position: position as usize,
                    quantity,
                }));
            }
        }

        let item = match source {
            ItemSource::Existing(item_id) => {
                load_item(&tx, item_id)?.ok_or(RepoError::ItemNotFound(item_id))?
            }
            ItemSource::New(fields) => {
                let item = Item::new(fields);
                insert_item(&tx, &item)?;
                load_item(&tx, item.id)?.ok_or_else(|| {
                    RepoError::InvalidData(format!("created item {} not found in read-back", item.id))
                })?
            }
        };

        tx.execute(
            "INSERT INTO list_entries (list_id, position, item_id, quantity)
             VALUES (?1, ?2, ?3, ?4);",
            params![list_id.to_string(), position, item.id.to_string(), quantity],
        )?;
        touch_list(&tx, list_id)?;
        tx.commit()?;

        Ok(item)
    }

    fn pull_item(&self, list_id: ListId, item_id: ItemId) -> RepoResult<ItemRemoval> {
        let mut tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !list_exists(&tx, list_id)? {
            return Err(RepoError::ListNotFound(list_id));
        }

        let entries_removed = tx.execute(
            "DELETE FROM list_entries WHERE list_id = ?1 AND item_id = ?2;",
            params![list_id.to_string(), item_id.to_string()],
        )?;
        if entries_removed > 0 {
            touch_list(&tx, list_id)?;
        }

        let item_collected = match collect_orphan_item(&mut tx, item_id) {
            Ok(collected) => collected,
            Err(err) => {
                warn!(
                    "event=item_gc module=repo status=error item_id={item_id} error={err}"
                );
                false
            }
        };
        tx.commit()?;

        Ok(ItemRemoval {
            entries_removed,
            item_collected,
        })
    }

    fn count_item_references(&self, item_id: ItemId) -> RepoResult<usize> {
        count_references(self.conn, item_id)
    }
}

/// Deletes the item inside a savepoint when nothing references it, so a
/// failure here rolls back only the collection step.
fn collect_orphan_item(tx: &mut Transaction<'_>, item_id: ItemId) -> RepoResult<bool> {
    let savepoint = tx.savepoint()?;
    if count_references(&savepoint, item_id)? > 0 {
        return Ok(false);
    }

    let deleted = savepoint.execute("DELETE FROM items WHERE id = ?1;", [item_id.to_string()])?;
    savepoint.commit()?;
    Ok(deleted > 0)
}

fn count_references(conn: &Connection, item_id: ItemId) -> RepoResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT list_id)
         FROM list_entries
         WHERE item_id = ?1;",
        [item_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn query_lists(conn: &Connection, sql: &str, key: &str) -> RepoResult<Vec<List>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut lists = Vec::new();
    while let Some(row) = rows.next()? {
        let mut list = parse_list_row(row)?;
        fill_list_children(conn, &mut list)?;
        lists.push(list);
    }
    Ok(lists)
}

fn load_list(conn: &Connection, id: ListId) -> RepoResult<Option<List>> {
    let mut stmt = conn.prepare(&format!("{LIST_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => {
            let mut list = parse_list_row(row)?;
            fill_list_children(conn, &mut list)?;
            Ok(Some(list))
        }
        None => Ok(None),
    }
}

fn fill_list_children(conn: &Connection, list: &mut List) -> RepoResult<()> {
    let list_id = list.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT item_id, quantity
         FROM list_entries
         WHERE list_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([list_id.as_str()])?;
    while let Some(row) = rows.next()? {
        let id = row
            .get::<_, Option<String>>("item_id")?
            .map(|value| parse_uuid(&value, "list_entries.item_id"))
            .transpose()?;
        list.items.push(ListEntry {
            id,
            quantity: row.get("quantity")?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT user_id
         FROM list_shares
         WHERE list_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([list_id.as_str()])?;
    while let Some(row) = rows.next()? {
        list.shared_with.push(row.get("user_id")?);
    }

    Ok(())
}

fn write_entries(conn: &Connection, list_id: ListId, entries: &[ListEntry]) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO list_entries (list_id, position, item_id, quantity)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (position, entry) in entries.iter().enumerate() {
        stmt.execute(params![
            list_id.to_string(),
            position as i64,
            entry.id.map(|id| id.to_string()),
            entry.quantity,
        ])?;
    }
    Ok(())
}

fn write_shares(conn: &Connection, list_id: ListId, users: &[String]) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO list_shares (list_id, position, user_id)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, user) in users.iter().enumerate() {
        stmt.execute(params![list_id.to_string(), position as i64, user.as_str()])?;
    }
    Ok(())
}

fn insert_item(conn: &Connection, item: &Item) -> RepoResult<()> {
    let fields = serde_json::to_string(&item.fields)
        .map_err(|err| RepoError::InvalidData(format!("item fields are not serializable: {err}")))?;
    conn.execute(
        "INSERT INTO items (id, fields) VALUES (?1, ?2);",
        params![item.id.to_string(), fields],
    )?;
    Ok(())
}

fn load_item(conn: &Connection, id: ItemId) -> RepoResult<Option<Item>> {
    conn.query_row(
        &format!("{ITEM_SELECT_SQL} WHERE id = ?1;"),
        [id.to_string()],
        |row| Ok(parse_item_row(row)),
    )
    .optional()?
    .transpose()
}

fn list_exists(conn: &Connection, list_id: ListId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM lists WHERE id = ?1);",
        [list_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn next_entry_position(conn: &Connection, list_id: ListId) -> RepoResult<i64> {
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0)
         FROM list_entries
         WHERE list_id = ?1;",
        [list_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(position)
}

fn touch_list(conn: &Connection, list_id: ListId) -> RepoResult<()> {
    conn.execute(
        "UPDATE lists
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        [list_id.to_string()],
    )?;
    Ok(())
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<List> {
    let id_text: String = row.get("id")?;
    Ok(List {
        id: parse_uuid(&id_text, "lists.id")?,
        name: row.get("name")?,
        author: row.get("author")?,
        description: row.get("description")?,
        close_date: row.get("close_date")?,
        items: Vec::new(),
        shared_with: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let id_text: String = row.get("id")?;
    let fields_text: String = row.get("fields")?;
    let fields: ItemFields = serde_json::from_str(&fields_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid json object in items.fields for {id_text}: {err}"))
    })?;

    Ok(Item {
        id: parse_uuid(&id_text, "items.id")?,
        fields,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn ensure_list_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in ["lists", "list_entries", "list_shares", "items"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
