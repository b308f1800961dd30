use std::sync::{Arc, RwLock};

/// Holder of the bearer credential attached to backend requests.
///
/// No token means the session is unauthenticated.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn store(&self, token: String);

    fn clear(&self);
}

/// Process-local token store.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, e.g. one read from the environment.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.store(token.into());
        store
    }
}

impl TokenStore for InMemoryTokenStore {
    fn token(&self) -> Option<String> {
        let guard = match self.token.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    fn store(&self, token: String) {
        let token = token.trim().to_owned();
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = (!token.is_empty()).then_some(token);
    }

    fn clear(&self) {
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}
