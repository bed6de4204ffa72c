use billforge_core::UserId;

/// Authenticated caller of a request.
///
/// Inserted by the auth middleware; every resource handler scopes its reads
/// and writes to `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    email: String,
}

impl UserContext {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
