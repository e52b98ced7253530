//! Domain types and DTOs
//!
//! Entities, request/response shapes and the small amount of pure logic
//! (status tables, permission names) that belongs to the data itself.

/// Implements `as_str`, `parse` and `Display` for a snake_case enum that is
/// stored as TEXT in Postgres.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod admin;
pub mod auth;
pub mod bids;
pub mod categories;
pub mod payments;
pub mod profiles;
pub mod questions;
pub mod reviews;
pub mod tenders;
pub mod users;

// Re-export commonly used types
pub use admin::*;
pub use bids::*;
pub use categories::*;
pub use payments::*;
pub use profiles::*;
pub use questions::*;
pub use reviews::*;
pub use tenders::*;
pub use users::*;

/// Email shape accepted across the API: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Lower-cased, trimmed form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
