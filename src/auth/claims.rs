use serde::{Deserialize, Serialize};

use crate::domain::UserType;

/// JWT claims carried by bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Account type at issue time
    pub user_type: UserType,

    /// Whether the account was an admin at issue time
    #[serde(default)]
    pub is_admin: bool,
}
