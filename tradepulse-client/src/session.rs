//! Session lifecycle: the single owner of the bearer token and the
//! authenticated identity. No other component writes `authToken`.

use anyhow::Error;

use tradepulse_http::http::v1::{Client, UserProfile};

use crate::client::v1::ClientError;
use crate::store::{CredentialStore, KEY_AUTH_TOKEN};

/// A session is live iff both the verified profile and the token are held;
/// a token that has not been verified yet is not an authenticated session.
#[derive(Clone, Debug)]
pub enum SessionState {
    Unknown,
    Verifying,
    Authenticated { user: UserProfile, token: String },
    Anonymous,
}

#[derive(Debug)]
pub enum SessionError {
    InvalidCredentials,
    RegistrationRejected(String),
    ConnectionUnavailable,
    SessionExpired,
}

impl std::error::Error for SessionError {}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionError::InvalidCredentials => write!(f, "Incorrect email or password"),
            SessionError::RegistrationRejected(message) => write!(f, "{message}"),
            SessionError::ConnectionUnavailable => {
                write!(f, "Unable to reach the TradePulse backend")
            }
            SessionError::SessionExpired => write!(f, "Session expired, please sign in again"),
        }
    }
}

pub struct SessionManager<C: Client, S: CredentialStore> {
    client: C,
    store: S,
    state: SessionState,
}

impl<C: Client, S: CredentialStore> SessionManager<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            state: SessionState::Unknown,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Startup check. A persisted token moves the session through
    /// `Verifying`; any verification failure deletes the token and lands in
    /// `Anonymous`.
    pub async fn start(&mut self) -> &SessionState {
        match self.store.get(KEY_AUTH_TOKEN) {
            None => self.state = SessionState::Anonymous,
            Some(token) => {
                self.state = SessionState::Verifying;
                match self.client.me(&token).await {
                    Ok(user) => {
                        self.state = SessionState::Authenticated { user, token };
                    }
                    Err(err) => {
                        log::warn!("persisted session rejected: {err}");
                        self.store.remove(KEY_AUTH_TOKEN);
                        self.state = SessionState::Anonymous;
                    }
                }
            }
        }
        &self.state
    }

    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&UserProfile, SessionError> {
        let token = match self.client.login(email, password).await {
            Ok(token) => token,
            Err(err) if ClientError::is_transport(&err) => {
                // One reconnection probe before giving up on the backend.
                if self.client.health().await.is_err() {
                    return Err(SessionError::ConnectionUnavailable);
                }
                match self.client.login(email, password).await {
                    Ok(token) => token,
                    Err(err) if ClientError::is_transport(&err) => {
                        return Err(SessionError::ConnectionUnavailable)
                    }
                    Err(_) => return Err(SessionError::InvalidCredentials),
                }
            }
            Err(_) => return Err(SessionError::InvalidCredentials),
        };

        let user = match self.client.me(&token.access_token).await {
            Ok(user) => user,
            Err(err) if ClientError::is_transport(&err) => {
                return Err(SessionError::ConnectionUnavailable)
            }
            Err(_) => return Err(SessionError::InvalidCredentials),
        };

        self.store.set(KEY_AUTH_TOKEN, &token.access_token);
        self.state = SessionState::Authenticated {
            user,
            token: token.access_token,
        };
        Ok(self.user().unwrap())
    }

    /// Registration failures carry the backend's message verbatim; success
    /// flows straight into `login`.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&UserProfile, SessionError> {
        match self.client.register(email, password).await {
            Ok(_) => self.login(email, password).await,
            Err(err) if ClientError::is_transport(&err) => {
                Err(SessionError::ConnectionUnavailable)
            }
            Err(err) => {
                let message = ClientError::rejection_message(&err)
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                Err(SessionError::RegistrationRejected(message))
            }
        }
    }

    /// Synchronous and infallible: clears the persisted token and the
    /// in-memory state.
    pub fn logout(&mut self) {
        self.store.remove(KEY_AUTH_TOKEN);
        self.state = SessionState::Anonymous;
    }

    /// Re-verifies the currently held token. No-op when no token is held.
    pub async fn refresh(&mut self) {
        let token = match &self.state {
            SessionState::Authenticated { token, .. } => token.clone(),
            _ => return,
        };
        self.state = SessionState::Verifying;
        match self.client.me(&token).await {
            Ok(user) => self.state = SessionState::Authenticated { user, token },
            Err(err) => {
                log::warn!("session refresh rejected: {err}");
                self.store.remove(KEY_AUTH_TOKEN);
                self.state = SessionState::Anonymous;
            }
        }
    }

    /// The session observer for transport-level authorization failures: an
    /// `Unauthorized` anywhere is fatal to the session, never retried.
    /// Returns the `SessionExpired` verdict when the session was cleared.
    pub fn observe(&mut self, error: &Error) -> Option<SessionError> {
        if !ClientError::is_unauthorized(error) {
            return None;
        }
        self.store.remove(KEY_AUTH_TOKEN);
        self.state = SessionState::Anonymous;
        Some(SessionError::SessionExpired)
    }
}
