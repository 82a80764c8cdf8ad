use stockroom_auth::{Subject, TokenClaims};
use stockroom_core::UserId;

/// Authenticated caller for a request, inserted by the auth middleware.
///
/// Present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext {
    subject: Subject,
}

impl SubjectContext {
    pub fn new(subject: Subject) -> Self {
        Self { subject }
    }

    pub fn user_id(&self) -> UserId {
        self.subject.user_id
    }

    pub fn email(&self) -> &str {
        &self.subject.email
    }

    pub fn name(&self) -> &str {
        &self.subject.name
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.subject.claims
    }
}
