//! Core domain logic for listshare.
//! This crate owns the list/item consistency rules and their SQLite store.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemFields, ItemId};
pub use model::list::{
    HydratedEntry, HydratedList, List, ListEntry, ListId, ListReplacement, ListValidationError,
    NewItemRequest, NewList, UserId,
};
pub use repo::list_repo::{
    ItemRemoval, ItemSource, ListRepository, RepoError, RepoResult, SqliteListRepository,
};
pub use service::list_service::{ListService, ListServiceError, ListServiceResult, Visibility};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
