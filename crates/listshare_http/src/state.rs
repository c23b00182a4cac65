//! Shared handler state.
//!
//! # Invariants
//! - One SQLite connection serves every request; store work holds its lock
//!   on the blocking pool, never on an async worker.
//! - A panic while holding the lock does not take the store down: the
//!   interrupted SQLite transaction rolls back on drop, so the next request
//!   reuses the connection.

use crate::auth::AuthGate;
use crate::error::ApiError;
use listshare_core::{
    ListService, ListServiceError, ListServiceResult, SqliteListRepository, Visibility,
};
use log::{error, warn};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    auth: Arc<dyn AuthGate>,
    visibility: Visibility,
}

impl AppState {
    /// `conn` must come from `listshare_core::db::open_db*`.
    pub fn new(conn: Connection, auth: impl AuthGate + 'static, visibility: Visibility) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            auth: Arc::new(auth),
            visibility,
        }
    }

    pub fn auth(&self) -> &dyn AuthGate {
        self.auth.as_ref()
    }

    /// Runs `f` against a list service bound to the shared connection.
    pub async fn with_list_service<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&ListService<SqliteListRepository<'_>>) -> ListServiceResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let visibility = self.visibility;

        tokio::task::spawn_blocking(move || -> Result<T, ApiError> {
            let conn = db.lock().unwrap_or_else(|poisoned| {
                warn!("event=db_lock module=http status=recovered error=poisoned");
                poisoned.into_inner()
            });
            let repo = SqliteListRepository::try_new(&conn).map_err(ListServiceError::from)?;
            let service = ListService::new(repo).with_visibility(visibility);
            f(&service).map_err(ApiError::from)
        })
        .await
        .map_err(|err| {
            error!("event=blocking_task module=http status=error error={err}");
            ApiError::Internal
        })?
    }
}
