//! Resolved user identity, consumed as a capability.
//!
//! The core never authenticates anyone; it only asks who the caller is.

use crate::memo::OwnerId;

/// Source of the authenticated owner for the current request/session.
pub trait IdentityProvider: Send + Sync {
    /// `None` when nobody is logged in.
    fn current_owner(&self) -> Option<OwnerId>;
}

/// A fixed identity, or none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticIdentity(Option<OwnerId>);

impl StaticIdentity {
    pub fn logged_in(owner: OwnerId) -> Self {
        Self(Some(owner))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_owner(&self) -> Option<OwnerId> {
        self.0
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for std::sync::Arc<T> {
    fn current_owner(&self) -> Option<OwnerId> {
        (**self).current_owner()
    }
}
