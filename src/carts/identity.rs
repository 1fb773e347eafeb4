//! Cart identity

use crate::uuids::TypedUuid;

/// Authenticated user UUID
pub type UserUuid = TypedUuid<UserMarker>;

/// Marker type for [`UserUuid`].
#[derive(Debug)]
pub struct UserMarker;

/// Anonymous guest token
pub type GuestToken = TypedUuid<GuestMarker>;

/// Marker type for [`GuestToken`].
#[derive(Debug)]
pub struct GuestMarker;

/// Who a cart request is made on behalf of.
///
/// Both halves may be present at once: a browser that still carries its guest
/// token after the user logs in. That is the case ownership reconciliation
/// resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CartIdentity {
    /// Logged in user, if any
    pub user: Option<UserUuid>,

    /// Guest token, if any
    pub token: Option<GuestToken>,
}

impl CartIdentity {
    /// Identity of a logged in user without a guest token.
    pub const fn user(user: UserUuid) -> Self {
        Self {
            user: Some(user),
            token: None,
        }
    }

    /// Identity of an anonymous guest.
    pub const fn guest(token: GuestToken) -> Self {
        Self {
            user: None,
            token: Some(token),
        }
    }

    /// Neither a user nor a token.
    pub const fn is_anonymous(&self) -> bool {
        self.user.is_none() && self.token.is_none()
    }

    /// Same identity with the given token attached.
    #[must_use]
    pub const fn with_token(self, token: GuestToken) -> Self {
        Self {
            user: self.user,
            token: Some(token),
        }
    }
}
