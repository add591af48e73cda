//! Session store: the only writer of the persisted auth record.
//!
//! One [`SessionStore`] exists per request, wrapping that visitor's
//! tower-sessions record. Mutations take `&mut self`, so at most one auth
//! operation is in flight per store. Readers subscribe to a watch channel
//! and see `is_loading == true` for the duration of hydration and of every
//! sign-in, sign-up and sign-out.
//!
//! Dropping an operation's future part-way abandons it: nothing after the
//! last completed await is written, and the session layer only saves what
//! was inserted before the drop.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, watch};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use open_impact_core::{AuthState, GuardDestinations, Identity, IdentityUpdate, SessionState};

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::session_keys;
use crate::services::auth::{AuthError, Credentials, IdentityProvider, Registration};

/// What hydration found in the session record.
enum Record {
    Valid(Identity),
    Absent,
    /// Signed-out marker left behind with no identity.
    Stale,
    Corrupt(String),
}

/// Current identity plus loading flag, persisted in the session record.
pub struct SessionStore {
    session: Session,
    provider: Arc<dyn IdentityProvider>,
    landing: String,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// A store in the initial loading state. Call [`hydrate`](Self::hydrate) next.
    #[must_use]
    pub fn new(
        session: Session,
        provider: Arc<dyn IdentityProvider>,
        destinations: &GuardDestinations,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            session,
            provider,
            landing: destinations.landing.clone(),
            state,
        }
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The read accessor view of the current state.
    #[must_use]
    pub fn auth(&self) -> AuthState {
        self.state.borrow().auth_state()
    }

    /// Restore the identity from the session record.
    ///
    /// A record that does not deserialize, or whose authenticated marker
    /// disagrees with it, is deleted and the visitor is treated as signed
    /// out. Never fails; always ends with loading cleared.
    pub async fn hydrate(&mut self) {
        self.begin();

        let next = match self.load_record().await {
            Ok(Record::Valid(identity)) => {
                tracing::debug!(identity_id = %identity.id, "Session restored");
                SessionState::authenticated(identity)
            }
            Ok(Record::Absent) => SessionState::anonymous(),
            Ok(Record::Stale) => {
                tracing::debug!("Removing stale signed-out marker");
                self.clear_record().await;
                SessionState::anonymous()
            }
            Ok(Record::Corrupt(reason)) => {
                tracing::warn!(%reason, "Discarding corrupt session record");
                self.clear_record().await;
                SessionState::anonymous()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read session record");
                SessionState::anonymous()
            }
        };

        self.publish(next);
    }

    /// Sign in with credentials verified by the identity provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for malformed credentials, the
    /// provider's error if verification fails, or `AuthError::Session` if
    /// the record cannot be written. The previous state is kept on error.
    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<Identity, AuthError> {
        credentials.validate_shape()?;

        let previous = self.begin();
        match self.provider.authenticate(credentials).await {
            Ok(identity) => {
                tracing::info!(
                    identity_id = %identity.id,
                    method = credentials.method(),
                    "Signed in"
                );
                self.establish(identity, previous).await
            }
            Err(e) => {
                self.publish(previous);
                Err(e)
            }
        }
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns the provider's error (e.g. `AuthError::EmailTaken`) or
    /// `AuthError::Session` if the record cannot be written. The previous
    /// state is kept on error.
    pub async fn sign_up(&mut self, registration: &Registration) -> Result<Identity, AuthError> {
        let previous = self.begin();
        match self.provider.register(registration).await {
            Ok(identity) => {
                tracing::info!(
                    identity_id = %identity.id,
                    account_type = %identity.account_type,
                    "Account created"
                );
                self.establish(identity, previous).await
            }
            Err(e) => {
                self.publish(previous);
                Err(e)
            }
        }
    }

    /// Merge `update` into the current identity and persist it.
    ///
    /// Returns `Ok(None)` without doing anything when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidProfile` if a link is not an http(s)
    /// address, the provider's error if the profile cannot be saved, or
    /// `AuthError::Session` if the record cannot be written.
    pub async fn update_identity(
        &mut self,
        update: &IdentityUpdate,
    ) -> Result<Option<Identity>, AuthError> {
        let current = self.state.borrow().identity().cloned();
        let Some(mut identity) = current else {
            return Ok(None);
        };

        if !identity.apply(update)? {
            return Ok(Some(identity));
        }

        self.provider.update_profile(&identity).await?;
        self.write_record(&identity).await?;
        tracing::info!(identity_id = %identity.id, "Profile updated");

        self.publish(SessionState::authenticated(identity.clone()));
        Ok(Some(identity))
    }

    /// Sign out and return the public landing path to navigate to.
    pub async fn sign_out(&mut self) -> String {
        let signed_in = self.state.borrow().identity().map(|identity| identity.id);
        self.begin();

        self.clear_record().await;
        if let Err(e) = self.session.flush().await {
            tracing::error!(error = %e, "Failed to flush session");
        }

        if let Some(id) = signed_in {
            tracing::info!(identity_id = %id, "Signed out");
            add_breadcrumb("auth", "Signed out", None);
        }
        clear_sentry_user();

        self.publish(SessionState::anonymous());
        self.landing.clone()
    }

    /// Mark an operation in flight and return the settled state before it.
    fn begin(&self) -> SessionState {
        let previous = {
            let current = self.state.borrow();
            if current.is_loading() {
                SessionState::anonymous()
            } else {
                current.clone()
            }
        };
        self.publish(previous.in_flight());
        previous
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    async fn establish(
        &mut self,
        identity: Identity,
        previous: SessionState,
    ) -> Result<Identity, AuthError> {
        // New sign-in, new session ID.
        let persisted = match self.session.cycle_id().await {
            Ok(()) => self.write_record(&identity).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = persisted {
            self.publish(previous);
            return Err(e);
        }

        set_sentry_user(&identity.id, Some(identity.email.as_str()));
        add_breadcrumb(
            "auth",
            "Signed in",
            Some(&[("account_type", identity.account_type.as_str())]),
        );

        self.publish(SessionState::authenticated(identity.clone()));
        Ok(identity)
    }

    async fn write_record(&self, identity: &Identity) -> Result<(), AuthError> {
        self.session.insert(session_keys::USER, identity).await?;
        self.session
            .insert(session_keys::AUTHENTICATED, true)
            .await?;
        Ok(())
    }

    async fn load_record(&self) -> Result<Record, SessionError> {
        let identity = match self.session.get::<Identity>(session_keys::USER).await {
            Ok(identity) => identity,
            Err(SessionError::SerdeJson(e)) => {
                return Ok(Record::Corrupt(format!("unreadable identity: {e}")));
            }
            Err(e) => return Err(e),
        };
        let marker = match self.session.get::<bool>(session_keys::AUTHENTICATED).await {
            Ok(marker) => marker,
            Err(SessionError::SerdeJson(e)) => {
                return Ok(Record::Corrupt(format!("unreadable marker: {e}")));
            }
            Err(e) => return Err(e),
        };

        Ok(match (identity, marker) {
            (Some(identity), Some(true)) => Record::Valid(identity),
            (None, None) => Record::Absent,
            (None, Some(false)) => Record::Stale,
            (Some(_), _) => Record::Corrupt("identity without authenticated marker".to_owned()),
            (None, Some(true)) => {
                Record::Corrupt("authenticated marker without identity".to_owned())
            }
        })
    }

    /// Remove both auth keys, whatever they hold.
    async fn clear_record(&self) {
        for key in [session_keys::USER, session_keys::AUTHENTICATED] {
            if let Err(e) = self.session.remove_value(key).await {
                tracing::error!(error = %e, key, "Failed to clear session key");
            }
        }
    }
}

/// Per-request handle to the [`SessionStore`].
///
/// Cheap to clone. Readers use [`settled`](Self::settled); handlers that
/// mutate take the lock.
#[derive(Clone)]
pub struct AuthSession {
    store: Arc<Mutex<SessionStore>>,
    state: watch::Receiver<SessionState>,
}

impl AuthSession {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        let state = store.subscribe();
        Self {
            store: Arc::new(Mutex::new(store)),
            state,
        }
    }

    /// Hydrate the wrapped store.
    pub async fn hydrate(&self) {
        self.store.lock().await.hydrate().await;
    }

    /// Current state, possibly still loading.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until no operation is in flight, then return the state.
    pub async fn settled(&self) -> SessionState {
        let mut state = self.state.clone();
        match state.wait_for(|s| !s.is_loading()).await {
            Ok(settled) => (*settled).clone(),
            // Store dropped mid-operation: nothing was established.
            Err(_) => SessionState::anonymous(),
        }
    }

    /// Exclusive access for mutations.
    pub async fn lock(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use secrecy::SecretString;
    use tokio::sync::Notify;
    use tower_sessions::MemoryStore;

    use open_impact_core::{AccountType, CompanySize, Email, Industry, Organization};

    use super::*;
    use crate::services::auth::MemoryIdentityProvider;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn store(session: &Session, provider: Arc<dyn IdentityProvider>) -> SessionStore {
        SessionStore::new(session.clone(), provider, &GuardDestinations::default())
    }

    fn registration(account_type: AccountType) -> Registration {
        Registration {
            name: "Grace Hopper".into(),
            email: Email::parse("grace@acme.example.org").unwrap(),
            password: SecretString::from("cobol-1959"),
            account_type,
            organization: account_type.is_organization().then(|| {
                Organization::new("Acme", Industry::Technology, CompanySize::Small)
            }),
        }
    }

    async fn signed_up(account_type: AccountType) -> (Session, SessionStore) {
        let session = session();
        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        store.hydrate().await;
        store.sign_up(&registration(account_type)).await.unwrap();
        (session, store)
    }

    #[tokio::test]
    async fn test_new_store_is_loading_until_hydrated() {
        let session = session();
        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        assert!(store.state().is_loading());

        store.hydrate().await;
        let auth = store.auth();
        assert!(!auth.is_loading);
        assert!(!auth.is_authenticated);
        assert!(auth.identity.is_none());
    }

    #[tokio::test]
    async fn test_hydrate_then_sign_out_leaves_no_record() {
        let (session, mut store) = signed_up(AccountType::Individual).await;
        assert!(store.state().is_authenticated());

        let landing = store.sign_out().await;
        assert_eq!(landing, "/");
        assert!(store.state().identity().is_none());
        assert!(!store.state().is_loading());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());
        assert!(
            session
                .get_value(session_keys::AUTHENTICATED)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sign_up_tag_survives_reload() {
        let backing = Arc::new(MemoryStore::default());
        let session = Session::new(None, backing.clone(), None);
        let provider: Arc<dyn IdentityProvider> = Arc::new(MemoryIdentityProvider::new());

        let mut first = store(&session, provider.clone());
        first.hydrate().await;
        let identity = first.sign_up(&registration(AccountType::Company)).await.unwrap();
        assert_eq!(identity.account_type, AccountType::Company);
        session.save().await.unwrap();

        let reloaded = Session::new(session.id(), backing, None);
        let mut second = store(&reloaded, provider);
        second.hydrate().await;
        assert_eq!(
            second.state().identity().map(|i| i.account_type),
            Some(AccountType::Company)
        );
    }

    #[tokio::test]
    async fn test_update_identity_persists_merge() {
        let (session, mut store) = signed_up(AccountType::Company).await;

        let updated = store
            .update_identity(&IdentityUpdate {
                organization_name: Some("Acme Renewables".into()),
                image: Some("https://cdn.example.org/grace.png".into()),
                ..IdentityUpdate::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.organization.as_ref().unwrap().name, "Acme Renewables");

        let mut fresh = self::store(&session, Arc::new(MemoryIdentityProvider::new()));
        fresh.hydrate().await;
        let state = fresh.state();
        let restored = state.identity().unwrap();
        assert_eq!(restored.image.as_deref(), Some("https://cdn.example.org/grace.png"));
        assert_eq!(restored.organization.as_ref().unwrap().name, "Acme Renewables");
        assert_eq!(restored.name, "Grace Hopper");
    }

    #[tokio::test]
    async fn test_update_identity_without_identity_is_noop() {
        let session = session();
        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        store.hydrate().await;

        let result = store
            .update_identity(&IdentityUpdate {
                name: Some("Nobody".into()),
                ..IdentityUpdate::default()
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_cleared() {
        let session = session();
        session
            .insert(session_keys::USER, serde_json::json!({"id": "not-a-uuid"}))
            .await
            .unwrap();
        session.insert(session_keys::AUTHENTICATED, true).await.unwrap();

        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        store.hydrate().await;

        assert!(!store.state().is_loading());
        assert!(store.state().identity().is_none());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());
        assert!(
            session
                .get_value(session_keys::AUTHENTICATED)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_with_invalid_email_is_corrupt() {
        let (session, store) = signed_up(AccountType::Individual).await;
        let mut json = serde_json::to_value(store.state().identity().unwrap()).unwrap();
        json["email"] = serde_json::json!("not an email");
        session.insert(session_keys::USER, json).await.unwrap();

        let mut fresh = self::store(&session, Arc::new(MemoryIdentityProvider::new()));
        fresh.hydrate().await;
        assert!(fresh.state().identity().is_none());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_marker_mismatch_is_cleared() {
        let (session, _) = signed_up(AccountType::Individual).await;
        session.remove_value(session_keys::AUTHENTICATED).await.unwrap();

        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        store.hydrate().await;
        assert!(store.state().identity().is_none());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());

        session.insert(session_keys::AUTHENTICATED, true).await.unwrap();
        store.hydrate().await;
        assert!(store.state().identity().is_none());
        assert!(
            session
                .get_value(session_keys::AUTHENTICATED)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_signed_out_marker_is_absent_and_removed() {
        let session = session();
        session.insert(session_keys::AUTHENTICATED, false).await.unwrap();

        let mut store = store(&session, Arc::new(MemoryIdentityProvider::new()));
        store.hydrate().await;
        assert!(!store.state().is_loading());
        assert!(store.state().identity().is_none());
        assert!(
            session
                .get_value(session_keys::AUTHENTICATED)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_failed_sign_in_stays_anonymous() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider
            .register(&registration(AccountType::Individual))
            .await
            .unwrap();

        let session = session();
        let mut store = store(&session, provider);
        store.hydrate().await;

        let err = store
            .sign_in(&Credentials::password("grace@acme.example.org", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!store.state().is_loading());
        assert!(store.state().identity().is_none());
        assert!(session.get_value(session_keys::USER).await.unwrap().is_none());

        let err = store
            .sign_in(&Credentials::password("", "cobol-1959"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("email")));
    }

    #[tokio::test]
    async fn test_sign_in_persists_record() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider
            .register(&registration(AccountType::Nonprofit))
            .await
            .unwrap();

        let session = session();
        let mut store = store(&session, provider);
        store.hydrate().await;
        let identity = store
            .sign_in(&Credentials::password("grace@acme.example.org", "cobol-1959"))
            .await
            .unwrap();

        let stored: Identity = session.get(session_keys::USER).await.unwrap().unwrap();
        assert_eq!(stored, identity);
        assert_eq!(
            session.get::<bool>(session_keys::AUTHENTICATED).await.unwrap(),
            Some(true)
        );
    }

    struct GatedProvider {
        inner: MemoryIdentityProvider,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl IdentityProvider for GatedProvider {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
            self.gate.notified().await;
            self.inner.authenticate(credentials).await
        }

        async fn register(&self, registration: &Registration) -> Result<Identity, AuthError> {
            self.inner.register(registration).await
        }

        async fn update_profile(&self, identity: &Identity) -> Result<(), AuthError> {
            self.inner.update_profile(identity).await
        }

        async fn is_ready(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_sign_in_is_observable_as_loading() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(GatedProvider {
            inner: MemoryIdentityProvider::new(),
            gate: gate.clone(),
        });
        provider
            .register(&registration(AccountType::Individual))
            .await
            .unwrap();

        let mut store = store(&session(), provider);
        store.hydrate().await;
        let handle = AuthSession::new(store);
        let mut watcher = handle.state.clone();
        watcher.borrow_and_update();

        let signing_in = handle.clone();
        let task = tokio::spawn(async move {
            signing_in
                .lock()
                .await
                .sign_in(&Credentials::password("grace@acme.example.org", "cobol-1959"))
                .await
        });

        watcher.changed().await.unwrap();
        assert!(watcher.borrow_and_update().is_loading());
        assert!(handle.current().identity().is_none());

        gate.notify_one();
        let settled = handle.settled().await;
        assert!(settled.is_authenticated());
        assert!(task.await.unwrap().is_ok());
    }
}
