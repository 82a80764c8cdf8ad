use stockroom_core::UserId;

use crate::lockout::LockoutState;

/// The authentication view of a user record.
///
/// Stores hand these out; the verifier and the request gate never see the rest
/// of the user document.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    /// Natural key used at login (the email address).
    pub email: String,
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub lockout: LockoutState,
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"<redacted>")
            .field("lockout", &self.lockout)
            .finish()
    }
}
