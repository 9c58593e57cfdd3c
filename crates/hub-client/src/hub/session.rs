//! Hub session state.

use crate::error::{ClientError, Result};

/// Authentication state for one hub connection.
///
/// Starts unauthenticated; only a successful sign-in fills it in. Pass it by
/// reference to every call that needs an authenticated registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSession {
    token: Option<String>,
    user_id: Option<String>,
}

impl HubSession {
    /// An unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful sign-in. Both values must be non-empty.
    pub(crate) fn establish(&mut self, token: String, user_id: String) {
        self.token = Some(token);
        self.user_id = Some(user_id);
    }

    /// Forget the sign-in.
    pub fn clear(&mut self) {
        self.token = None;
        self.user_id = None;
    }

    /// Whether sign-in succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user_id.is_some()
    }

    /// Session token issued by the registry.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// User id decoded from the token, e.g. `user:abc`.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Token and user id, or an authentication error when not signed in.
    pub(crate) fn credentials(&self) -> Result<(&str, &str)> {
        match (self.token.as_deref(), self.user_id.as_deref()) {
            (Some(token), Some(user_id)) => Ok((token, user_id)),
            _ => Err(ClientError::Authentication("not signed in".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn new_session_is_unauthenticated() {
        let session = HubSession::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.credentials().unwrap_err().kind(), ErrorKind::Authentication);
    }

    #[test]
    fn establish_and_clear() {
        let mut session = HubSession::new();
        session.establish("tok".into(), "user:1".into());
        assert!(session.is_authenticated());
        assert_eq!(session.credentials().unwrap(), ("tok", "user:1"));

        session.clear();
        assert_eq!(session, HubSession::new());
    }
}
