use serde::{Deserialize, Serialize};

/// JWT payload identifying the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,  // user ID
    pub name: String, // username the token was issued to
    pub iat: i64,     // issued at (unix timestamp)
    pub exp: i64,     // expires at (unix timestamp)
}
