//! List use-case service.
//!
//! # Responsibility
//! - Provide the list operations exposed by the HTTP boundary: owned and
//!   shared listings, create, hydrated read, full update, delete, and item
//!   add/remove.
//! - Translate repository outcomes into the service error taxonomy.
//!
//! # Invariants
//! - Full updates always set `author` to the caller.
//! - Mutations return the read-back record, never the request payload.
//! - A removed item is verified absent from the read-back list.

use crate::model::item::ItemId;
use crate::model::list::{HydratedList, List, ListId, ListReplacement, NewItemRequest, NewList};
use crate::repo::list_repo::{ItemSource, ListRepository, RepoError};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Who may read a list through a direct fetch by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Any authenticated caller.
    #[default]
    Open,
    /// Only the author and `shared_with` members; others get not-found.
    Members,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Members => "members",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "members" => Ok(Self::Members),
            other => Err(format!(
                "unsupported list visibility `{other}`; expected open|members"
            )),
        }
    }
}

/// Service error for list use-cases.
#[derive(Debug)]
pub enum ListServiceError {
    /// A required identifier or field is missing. Nothing was mutated.
    InvalidRequest(&'static str),
    /// Target list does not exist (or is hidden from the caller).
    ListNotFound(ListId),
    /// Persistence-layer failure, including unresolvable item references.
    Repo(RepoError),
    /// Read-back disagrees with the write that preceded it.
    InconsistentState(&'static str),
}

impl Display for ListServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(details) => write!(f, "invalid request: {details}"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent list state: {details}"),
        }
    }
}

impl Error for ListServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ListServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ListNotFound(id) => Self::ListNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type ListServiceResult<T> = Result<T, ListServiceError>;

/// List service facade over repository implementations.
pub struct ListService<R: ListRepository> {
    repo: R,
    visibility: Visibility,
}

impl<R: ListRepository> ListService<R> {
    /// Creates a service with [`Visibility::Open`] direct reads.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            visibility: Visibility::Open,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Lists authored by the caller. Lists only shared with them are excluded.
    pub fn list_owned(&self, caller: &str) -> ListServiceResult<Vec<List>> {
        Ok(self.repo.lists_by_author(caller)?)
    }

    /// Lists whose share set contains the caller.
    pub fn list_shared(&self, caller: &str) -> ListServiceResult<Vec<List>> {
        Ok(self.repo.lists_shared_with(caller)?)
    }

    /// Creates a list authored by the caller.
    ///
    /// Name and quantity validation happens in the store; its failures come
    /// back as [`ListServiceError::Repo`].
    pub fn create_list(&self, caller: &str, payload: NewList) -> ListServiceResult<List> {
        let list = payload.into_list(caller);
        let list_id = self.repo.create_list(&list)?;
        info!("event=list_create module=service status=ok list_id={list_id}");
        self.read_back(list_id, "created list not found in read-back")
    }

    /// Reads one list with every entry merged with its item's fields.
    ///
    /// Entries without an id are dropped. Under [`Visibility::Members`] a
    /// caller who is neither author nor member sees not-found.
    pub fn get_list(&self, caller: &str, list_id: ListId) -> ListServiceResult<HydratedList> {
        let list = self
            .repo
            .get_list(list_id)?
            .ok_or(ListServiceError::ListNotFound(list_id))?;

        if self.visibility == Visibility::Members && !list.is_visible_to(caller) {
            debug!("event=list_get module=service status=hidden list_id={list_id}");
            return Err(ListServiceError::ListNotFound(list_id));
        }

        let items = self.repo.get_items(&list.referenced_item_ids())?;
        Ok(list.hydrate(items))
    }

    /// Replaces a list wholesale and hands its authorship to the caller.
    ///
    /// # Contract
    /// - `list_id` and a non-blank `name` are required; otherwise nothing is
    ///   written and `InvalidRequest` is returned.
    /// - Absent fields reset: `description` to `""`, `close_date` to none,
    ///   `items` and `shared_with` to empty.
    pub fn update_list(
        &self,
        caller: &str,
        list_id: Option<ListId>,
        payload: ListReplacement,
    ) -> ListServiceResult<List> {
        let list_id = list_id.ok_or(ListServiceError::InvalidRequest("list id is required"))?;
        let name = payload
            .required_name()
            .ok_or(ListServiceError::InvalidRequest("list name is required"))?
            .to_string();

        let list = List {
            id: list_id,
            name,
            author: caller.to_string(),
            description: Some(payload.description.unwrap_or_default()),
            close_date: payload.close_date,
            items: payload.items,
            shared_with: payload.shared_with,
            created_at: 0,
            updated_at: 0,
        };
        self.repo.replace_list(&list)?;
        info!("event=list_update module=service status=ok list_id={list_id}");
        self.read_back(list_id, "updated list not found in read-back")
    }

    /// Deletes a list and returns its last snapshot. Items are kept.
    pub fn delete_list(&self, caller: &str, list_id: Option<ListId>) -> ListServiceResult<List> {
        let list_id = list_id.ok_or(ListServiceError::InvalidRequest("list id is required"))?;
        let snapshot = self
            .repo
            .get_list(list_id)?
            .ok_or(ListServiceError::ListNotFound(list_id))?;

        self.repo.delete_list(list_id)?;
        info!(
            "event=list_delete module=service status=ok list_id={list_id} by_author={}",
            snapshot.author == caller
        );
        Ok(snapshot)
    }

    /// Removes every entry for `item_id` and collects the item once no list
    /// references it.
    pub fn remove_item_from_list(
        &self,
        list_id: ListId,
        item_id: ItemId,
    ) -> ListServiceResult<List> {
        let removal = self.repo.pull_item(list_id, item_id)?;
        let list = self.read_back(list_id, "list missing after item removal")?;
        if list.contains_item(item_id) {
            return Err(ListServiceError::InconsistentState("failed to remove item"));
        }

        info!(
            "event=list_item_remove module=service status=ok list_id={list_id} item_id={item_id} entries_removed={} item_collected={}",
            removal.entries_removed, removal.item_collected
        );
        Ok(list)
    }

    /// Appends an entry for an existing item (by id) or a newly created one.
    ///
    /// An id that does not resolve fails as a repository error, not as
    /// not-found.
    pub fn add_item_to_list(
        &self,
        list_id: ListId,
        request: NewItemRequest,
    ) -> ListServiceResult<List> {
        let source = match request.id {
            Some(item_id) => ItemSource::Existing(item_id),
            None => ItemSource::New(request.fields),
        };
        let item = self.repo.push_item(list_id, source, request.quantity)?;
        info!(
            "event=list_item_add module=service status=ok list_id={list_id} item_id={}",
            item.id
        );
        self.read_back(list_id, "list missing after item add")
    }

    fn read_back(&self, list_id: ListId, details: &'static str) -> ListServiceResult<List> {
        self.repo
            .get_list(list_id)?
            .ok_or(ListServiceError::InconsistentState(details))
    }
}
