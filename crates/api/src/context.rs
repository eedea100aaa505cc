use factoring_core::UserId;

/// Acting user for a request, from the `X-User-Id` header.
///
/// `None` means the directory's configured current user applies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ActingUser {
    user_id: Option<UserId>,
}

impl ActingUser {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
