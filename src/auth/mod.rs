pub mod claims;
pub mod context;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod tokens;

pub use claims::Claims;
pub use context::AuthContext;
pub use middleware::RequireAuth;
pub use password::PasswordHasher;
pub use policy::{authorize, require_all, Authorization, Requirement};
pub use tokens::{IssuedToken, TokenIssuer};
