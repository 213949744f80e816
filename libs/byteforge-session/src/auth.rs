// Authentication seam
// The session only asks "is someone logged in"; credentials live elsewhere.

use std::sync::RwLock;

pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Fixed answer, for embedding contexts that authenticate up front
#[derive(Debug, Clone, Copy)]
pub struct StaticAuth(pub bool);

impl AuthProvider for StaticAuth {
    fn is_authenticated(&self) -> bool {
        self.0
    }
}

/// Authenticated while a non-empty token is held
#[derive(Debug, Default)]
pub struct TokenAuth {
    token: RwLock<Option<String>>,
}

impl TokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = if token.is_empty() { None } else { Some(token) };
    }

    pub fn logout(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AuthProvider for TokenAuth {
    fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl<T: AuthProvider + ?Sized> AuthProvider for std::sync::Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_auth() {
        assert!(StaticAuth(true).is_authenticated());
        assert!(!StaticAuth(false).is_authenticated());
    }

    #[test]
    fn test_token_auth_login_logout() {
        let auth = TokenAuth::new(None);
        assert!(!auth.is_authenticated());

        auth.login("abc");
        assert!(auth.is_authenticated());
        assert_eq!(auth.token().as_deref(), Some("abc"));

        auth.logout();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn test_empty_token_is_not_a_login() {
        assert!(!TokenAuth::new(Some(String::new())).is_authenticated());

        let auth = TokenAuth::new(Some("abc".to_string()));
        auth.login("");
        assert!(!auth.is_authenticated());
    }
}
