use std::collections::HashMap;

use tokio::sync::RwLock;

use procura_core::domain::conversation::SessionState;

use super::{RepositoryError, SessionStore};

/// Session state held in process memory, keyed by session id.
///
/// Each session's state is written wholesale at the end of a turn, so
/// concurrent requests on different sessions never see each other's data.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: SessionState) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), state);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use procura_core::domain::conversation::{ChatMessage, SessionState};

    use crate::repositories::{InMemorySessionStore, SessionStore};

    #[tokio::test]
    async fn save_then_load_round_trips_state() {
        let store = InMemorySessionStore::new();
        let mut state = SessionState::default();
        state.transcript.push(ChatMessage::user("two thinkpads please"));

        store.save("session-1", state.clone()).await.expect("save succeeds");
        let loaded = store.load("session-1").await.expect("load succeeds");
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_id() {
        let store = InMemorySessionStore::new();
        let mut state = SessionState::default();
        state.transcript.push(ChatMessage::user("only session-1 sees this"));
        store.save("session-1", state).await.expect("save succeeds");

        assert!(store.load("session-2").await.expect("load succeeds").is_none());
    }

    #[tokio::test]
    async fn delete_removes_state() {
        let store = InMemorySessionStore::new();
        store.save("session-1", SessionState::default()).await.expect("save succeeds");
        store.delete("session-1").await.expect("delete succeeds");

        assert!(store.load("session-1").await.expect("load succeeds").is_none());
    }

    #[tokio::test]
    async fn save_replaces_previous_state() {
        let store = InMemorySessionStore::new();
        let mut first = SessionState::default();
        first.transcript.push(ChatMessage::user("first"));
        store.save("session-1", first).await.expect("save succeeds");

        let mut second = SessionState::default();
        second.transcript.push(ChatMessage::user("second"));
        second.transcript.push(ChatMessage::assistant("noted"));
        store.save("session-1", second.clone()).await.expect("save succeeds");

        let loaded = store.load("session-1").await.expect("load succeeds");
        assert_eq!(loaded, Some(second));
    }
}
