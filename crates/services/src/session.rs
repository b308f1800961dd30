use std::sync::{Arc, RwLock};

use storage::repository::{AuthRepository, StorageError, UserRecord};
use storage::token::TokenStore;
use tracing::info;

use crate::error::AuthError;

/// Authentication state shared by a viewing session.
///
/// Backed by the token store that the HTTP backend reads from, so signing in
/// here is what makes later requests authenticated.
#[derive(Clone)]
pub struct SessionContext {
    tokens: Arc<dyn TokenStore>,
    user: Arc<RwLock<Option<UserRecord>>>,
}

impl SessionContext {
    /// Resume whatever credential the store already holds.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            user: Arc::new(RwLock::new(None)),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.token().is_some()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        match self.user.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Exchange credentials for a token and keep it for later requests.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the backend's reason, or
    /// `AuthError::MissingCredentials` when either field is blank.
    pub async fn sign_in(
        &self,
        auth: &dyn AuthRepository,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let grant = auth.login(email, password).await.map_err(|e| match e {
            StorageError::Rejected(reason) => AuthError::Rejected(reason),
            other => AuthError::Storage(other),
        })?;
        self.tokens.store(grant.token);
        self.set_user(grant.user.clone());
        info!(email, "signed in");
        Ok(grant.user)
    }

    pub fn sign_out(&self) {
        self.tokens.clear();
        self.set_user(None);
        info!("signed out");
    }

    fn set_user(&self, user: Option<UserRecord>) {
        let mut guard = match self.user.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use storage::token::InMemoryTokenStore;

    #[tokio::test]
    async fn sign_in_and_out_drive_authentication() {
        let repo = InMemoryRepository::new();
        repo.add_account("ana@example.com", "secret", Some("Ana"))
            .unwrap();
        let session = SessionContext::new(Arc::new(InMemoryTokenStore::new()));
        assert!(!session.is_authenticated());

        let user = session
            .sign_in(&repo, "ana@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(user.unwrap().email, "ana@example.com");
        assert!(session.is_authenticated());

        session.sign_out();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn rejected_login_keeps_session_anonymous() {
        let repo = InMemoryRepository::new();
        let session = SessionContext::new(Arc::new(InMemoryTokenStore::new()));
        let err = session
            .sign_in(&repo, "who@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert!(!session.is_authenticated());

        let err = session.sign_in(&repo, " ", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }
}
