//! Administrator authentication.
//!
//! Credentials are checked only by the identity provider. The gate keeps the
//! current session and notifies observers when it changes.

pub mod identity_toolkit;

pub use identity_toolkit::IdentityToolkitClient;

use async_trait::async_trait;
use std::fmt;
use tokio::sync::watch;
use tracing::{info, warn};

/// Classified authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The email or password is not well formed.
    #[error("credential is not well formed")]
    InvalidFormat,

    /// Unknown account or wrong password.
    #[error("unknown account or wrong password")]
    InvalidCredential,

    /// The provider is throttling sign-in attempts.
    #[error("too many attempts")]
    RateLimited,

    /// Password sign-in is disabled for the project.
    #[error("password sign-in is disabled")]
    MethodDisabled,

    /// The provider handed out an anonymous session.
    #[error("anonymous sessions are not accepted")]
    AnonymousSession,

    /// No one is signed in.
    #[error("not signed in")]
    SignedOut,

    /// Anything else, including transport failures.
    #[error("identity provider error: {0}")]
    Other(String),
}

impl AuthError {
    /// Message safe to show on the login form. It never tells which field was
    /// wrong.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidFormat | AuthError::InvalidCredential => "Invalid credentials.",
            AuthError::RateLimited => "Too many attempts. Try again later.",
            AuthError::MethodDisabled => "Sign-in is currently unavailable.",
            AuthError::AnonymousSession | AuthError::SignedOut => {
                "Sign in with an administrator account."
            }
            AuthError::Other(_) => "Authentication failed. Try again.",
        }
    }
}

/// A signed-in identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    /// Opaque token issued by the provider.
    pub id_token: String,
    pub anonymous: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("id_token", &"<redacted>")
            .field("anonymous", &self.anonymous)
            .finish()
    }
}

/// An email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
}

/// Login gate in front of the detail dashboard.
pub struct AuthGate<P> {
    provider: P,
    session: watch::Sender<Option<Session>>,
}

impl<P: IdentityProvider> AuthGate<P> {
    pub fn new(provider: P) -> Self {
        let (session, _) = watch::channel(None);
        Self { provider, session }
    }

    /// Sign in through the provider. Anonymous sessions are refused and never
    /// become the current session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = match self.provider.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                return Err(e);
            }
        };

        if session.anonymous {
            warn!("Refusing anonymous session {}", session.user_id);
            return Err(AuthError::AnonymousSession);
        }

        info!("Signed in as {}", session.user_id);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Drop the current session.
    pub fn sign_out(&self) {
        if self.session.send_replace(None).is_some() {
            info!("Signed out");
        }
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// The current session, if it may see the detail dashboard.
    pub fn require_admin(&self) -> Result<Session, AuthError> {
        match self.current() {
            None => Err(AuthError::SignedOut),
            Some(session) if session.anonymous => Err(AuthError::AnonymousSession),
            Some(session) => Ok(session),
        }
    }
}
