use stockroom_core::UserId;

use crate::claims::TokenClaims;

/// An authenticated caller, admitted by the [`crate::RequestGate`].
///
/// `email` and `name` come from the account as it exists now, not from the
/// token, so renames are visible immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub claims: TokenClaims,
}
