use uuid::Uuid;

use super::Claims;
use crate::domain::User;

/// Authenticated caller, resolved from a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Current account state, loaded from the store on every request
    pub user: User,

    /// JWT claims
    claims: Claims,
}

impl AuthContext {
    pub fn new(user: User, claims: Claims) -> Self {
        Self { user, claims }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Get the JWT claims
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}
