use progress_core::model::{AuthToken, UserId};

/// An authenticated user as handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub token: AuthToken,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, token: AuthToken) -> Self {
        Self { user_id, token }
    }
}

/// Source of the current identity. `None` means nobody is signed in, which
/// suspends every read and write.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;
}

/// Provider with a fixed answer, used by the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Provider for a signed-out visitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn current(&self) -> Option<Identity> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_identity_reports_what_it_was_given() {
        let identity = Identity::new(UserId::new("u1"), AuthToken::new("t"));
        assert_eq!(
            StaticIdentity::signed_in(identity.clone()).current(),
            Some(identity)
        );
        assert_eq!(StaticIdentity::anonymous().current(), None);
        assert_eq!(Anonymous.current(), None);
    }
}
