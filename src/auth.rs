//! Token validation and session start-up

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};

use crate::connection::{ConnectionManager, Connector};
use crate::model::{AuthSession, KeyValueStore, PlayerApi, StateStore, TOKEN_KEY};

/// Exchanges a credential token for an authenticated session.
///
/// On success the token is persisted, the push connection is opened and the
/// media library is fetched once.
pub struct AuthGate<A, C> {
    api: Arc<A>,
    storage: Arc<dyn KeyValueStore>,
    connection: ConnectionManager<C>,
    store: Arc<StateStore<A>>,
    session: watch::Sender<AuthSession>,
    in_flight: Mutex<()>,
}

impl<A: PlayerApi, C: Connector> AuthGate<A, C> {
    pub fn new(
        api: Arc<A>,
        storage: Arc<dyn KeyValueStore>,
        connection: ConnectionManager<C>,
        store: Arc<StateStore<A>>,
    ) -> Self {
        let (session, _) = watch::channel(AuthSession::default());
        Self {
            api,
            storage,
            connection,
            store,
            session,
            in_flight: Mutex::new(()),
        }
    }

    pub fn session(&self) -> AuthSession {
        self.session.borrow().clone()
    }

    /// Token saved by an earlier successful validation
    pub fn persisted_token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read saved token");
                None
            }
        }
    }

    /// Forget the saved token. Callers use this after a failed validation.
    pub fn clear_persisted_token(&self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            tracing::warn!(error = %e, "Could not remove saved token");
        }
        self.session.send_modify(|session| session.token = None);
    }

    /// Validate `token` and, if the server accepts it, start the session.
    ///
    /// Never fails: rejections and transport errors both come back as
    /// `false` with the session marked unauthenticated. Concurrent calls run
    /// one at a time in call order.
    pub async fn validate_token_and_connect(&self, token: &str) -> bool {
        let _serial = self.in_flight.lock().await;

        let valid = match self.api.validate_token(token).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "Token validation failed");
                false
            }
        };

        if !valid {
            tracing::warn!("Token rejected");
            self.session.send_modify(|session| {
                session.is_authenticated = false;
                session.validated_at = None;
            });
            return false;
        }

        self.session.send_replace(AuthSession {
            token: Some(token.to_string()),
            is_authenticated: true,
            validated_at: Some(Utc::now()),
        });
        if let Err(e) = self.storage.set(TOKEN_KEY, token) {
            tracing::error!(error = %e, "Could not persist token");
        }
        tracing::info!("Token accepted, starting session");

        self.connection.connect();
        self.store.fetch_library().await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::FakeConnector;
    use crate::connection::{ConnectionStatus, ReconnectPolicy};
    use crate::model::api::fake::FakeApi;
    use crate::model::{MediaResolver, MemoryStore, Song};

    struct Harness {
        api: Arc<FakeApi>,
        storage: Arc<MemoryStore>,
        connector: FakeConnector,
        gate: AuthGate<FakeApi, FakeConnector>,
    }

    fn harness() -> Harness {
        let api = Arc::new(FakeApi::with_tokens(&["T"]));
        api.library.lock().unwrap().push(Song {
            id: "s1".into(),
            ..Default::default()
        });
        let storage = Arc::new(MemoryStore::new());
        let connector = FakeConnector::default();
        let store = Arc::new(StateStore::new(
            api.clone(),
            MediaResolver::new("http://jukebox.test", "mp3"),
        ));
        let connection = ConnectionManager::new(
            connector.clone(),
            "ws://jukebox.test/ws",
            ReconnectPolicy::fixed(std::time::Duration::from_secs(3)),
            store.clone(),
        );
        let gate = AuthGate::new(api.clone(), storage.clone(), connection, store);
        Harness {
            api,
            storage,
            connector,
            gate,
        }
    }

    #[tokio::test]
    async fn valid_token_starts_session() {
        let h = harness();

        assert!(h.gate.validate_token_and_connect("T").await);

        assert_eq!(h.storage.get(TOKEN_KEY).unwrap().as_deref(), Some("T"));
        let session = h.gate.session();
        assert!(session.is_authenticated);
        assert_eq!(session.token.as_deref(), Some("T"));
        assert!(session.validated_at.is_some());

        let mut status = h.gate.connection.subscribe_status();
        status.wait_for(|s| *s == ConnectionStatus::Open).await.unwrap();
        assert_eq!(h.connector.opened(), 1);
        assert_eq!(h.api.fetches(), 1);
        assert_eq!(h.gate.store.library().len(), 1);
    }

    #[tokio::test]
    async fn invalid_token_is_not_persisted() {
        let h = harness();

        assert!(!h.gate.validate_token_and_connect("nope").await);

        assert!(!h.gate.session().is_authenticated);
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.gate.connection.status(), ConnectionStatus::Idle);
        assert_eq!(h.connector.opened(), 0);
        assert_eq!(h.api.fetches(), 0);
    }

    #[tokio::test]
    async fn transport_failure_reads_as_rejection() {
        let h = harness();

        assert!(!h.gate.validate_token_and_connect("unreachable").await);
        assert!(!h.gate.session().is_authenticated);
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn later_rejection_keeps_earlier_token_on_disk() {
        let h = harness();
        assert!(h.gate.validate_token_and_connect("T").await);
        assert!(!h.gate.validate_token_and_connect("other").await);

        assert!(!h.gate.session().is_authenticated);
        assert_eq!(h.gate.persisted_token().as_deref(), Some("T"));

        h.gate.clear_persisted_token();
        assert_eq!(h.gate.persisted_token(), None);
        assert_eq!(h.gate.session().token, None);
    }

    #[tokio::test]
    async fn concurrent_validations_finish_in_call_order() {
        let h = harness();

        let (first, second) = tokio::join!(
            h.gate.validate_token_and_connect("nope"),
            h.gate.validate_token_and_connect("T"),
        );

        assert!(!first);
        assert!(second);
        assert!(h.gate.session().is_authenticated);
        assert_eq!(h.api.validations.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
