//! Credentials and bearer tokens
pub mod password;
pub mod token;

pub use password::{check_strength, hash_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer, TokenKind, TokenPair};
