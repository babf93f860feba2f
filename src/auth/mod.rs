mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use extractors::AuthUser;
pub use jwt::TokenService;
pub use password::{Argon2Hasher, CredentialHasher};
