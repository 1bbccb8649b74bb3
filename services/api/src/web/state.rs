//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-login session state.

use crate::config::Config;
use chrono::{DateTime, Utc};
use recruit_core::domain::GoogleUser;
use recruit_core::ports::{IdentityService, SpreadsheetStore};
use recruit_core::roster::Roster;
use recruit_core::sync::SyncService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub store: Arc<dyn SpreadsheetStore>,
    pub identity: Arc<dyn IdentityService>,
    pub sync: SyncService,
    pub config: Arc<Config>,
    sessions: RwLock<HashMap<String, Arc<RwLock<SessionData>>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SpreadsheetStore>,
        identity: Arc<dyn IdentityService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            sync: SyncService::new(store.clone()),
            store,
            identity,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) the session for an access token and returns
    /// the shared handle handlers will lock.
    pub async fn insert_session(
        &self,
        access_token: String,
        data: SessionData,
    ) -> Arc<RwLock<SessionData>> {
        let session = Arc::new(RwLock::new(data));
        self.sessions
            .write()
            .await
            .insert(access_token, session.clone());
        session
    }

    pub async fn session(&self, access_token: &str) -> Option<Arc<RwLock<SessionData>>> {
        self.sessions.read().await.get(access_token).cloned()
    }

    pub async fn remove_session(&self, access_token: &str) -> bool {
        self.sessions.write().await.remove(access_token).is_some()
    }
}

//=========================================================================================
// SessionData (Specific to One Login)
//=========================================================================================

/// The state for one authenticated session: the user identity and the
/// in-memory collections loaded from the backend at login. All collections
/// live for the session only; a reload re-fetches everything.
pub struct SessionData {
    pub user: GoogleUser,
    pub roster: Roster,
    pub loaded_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: GoogleUser, roster: Roster) -> Self {
        Self {
            user,
            roster,
            loaded_at: Utc::now(),
        }
    }
}
