//! Session boundary
//!
//! The authentication provider is an external collaborator; the engine only
//! reads its current state as a precondition and never mutates it.

use std::collections::BTreeSet;

/// Role granted elevated collection access (organizations, users).
pub const ROLE_ADMIN: &str = "admin";
/// Standard reviewer role.
pub const ROLE_REVIEWER: &str = "reviewer";

/// Snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub is_authenticated: bool,
    pub roles: BTreeSet<String>,
}

impl SessionInfo {
    pub fn authenticated<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_authenticated: true,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Read-only access to the current session state.
pub trait SessionProvider: Send + Sync {
    fn session(&self) -> SessionInfo;
}

/// A provider returning a fixed session, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticSession(pub SessionInfo);

impl SessionProvider for StaticSession {
    fn session(&self) -> SessionInfo {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_membership() {
        let session = SessionInfo::authenticated([ROLE_REVIEWER]);
        assert!(session.is_authenticated);
        assert!(session.has_role(ROLE_REVIEWER));
        assert!(!session.has_role(ROLE_ADMIN));

        assert!(!SessionInfo::anonymous().is_authenticated);
    }
}
