//! Authentication primitives: JWT encoding/verification, Argon2id password
//! hashing, and opaque-token hashing for at-rest storage.

pub mod jwt;
pub mod password;
pub mod token;

pub use jwt::{Claims, TokenKind};
