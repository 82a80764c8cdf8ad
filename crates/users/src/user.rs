use serde::{Deserialize, Serialize};

use stockroom_auth::{Account, LockoutState};
use stockroom_core::validate::{email, required_text, text_len};
use stockroom_core::{DomainError, DomainResult, ListField, SortSpec, UserId};

const MAX_NAME_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 32;

/// A user as stored: profile, credential digest and lockout bookkeeping.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub lockout: LockoutState,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("lockout", &self.lockout)
            .finish_non_exhaustive()
    }
}

impl User {
    /// A freshly registered user with a clean lockout record.
    pub fn register(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            name,
            email,
            password_hash,
            lockout: LockoutState::default(),
        }
    }
}

impl From<User> for Account {
    fn from(u: User) -> Self {
        Account {
            id: u.id,
            email: u.email,
            name: u.name,
            password_hash: u.password_hash,
            lockout: u.lockout,
        }
    }
}

/// Public shape of a user. Never carries credentials or lockout state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

fn check_password(label: &str, password: &str, confirm: &str) -> DomainResult<()> {
    text_len(label, password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)?;
    if password != confirm {
        return Err(DomainError::validation("Password confirmation mismatched"));
    }
    Ok(())
}

/// Input: registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        required_text("Name", &self.name, MAX_NAME_LEN)?;
        email("Email", &self.email)?;
        check_password("Password", &self.password, &self.password_confirm)
    }
}

/// Input: profile edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: String,
    pub email: String,
}

impl UpdateUser {
    pub fn validate(&self) -> DomainResult<()> {
        required_text("Name", &self.name, MAX_NAME_LEN)?;
        email("Email", &self.email)
    }
}

/// Input: password change. The old password is checked by the caller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePassword {
    pub password_old: String,
    pub password_new: String,
    pub password_confirm: String,
}

impl core::fmt::Debug for ChangePassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangePassword").finish_non_exhaustive()
    }
}

impl ChangePassword {
    pub fn validate(&self) -> DomainResult<()> {
        if self.password_old.is_empty() {
            return Err(DomainError::validation("Old password cannot be empty"));
        }
        check_password("New password", &self.password_new, &self.password_confirm)
    }
}

/// Fields accepted by `search` and `sort` on the user list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UserField {
    Name,
    Email,
}

impl UserField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
        }
    }

    pub fn text(self, user: &User) -> &str {
        match self {
            Self::Name => &user.name,
            Self::Email => &user.email,
        }
    }
}

impl ListField for UserField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    fn is_searchable(self) -> bool {
        true
    }

    fn default_sort() -> SortSpec<Self> {
        SortSpec::asc(Self::Email)
    }
}
