use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError};

/// A freshly signed token together with the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Issues and validates HS256 identity tokens bound to the process secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    has_secret: bool,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            has_secret: !secret.is_empty(),
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(&cfg.secret, Duration::hours(cfg.ttl_hours))
    }

    pub fn issue(&self, subject_id: &str, display_name: &str) -> Result<IssuedToken, AppError> {
        self.issue_at(subject_id, display_name, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        subject_id: &str,
        display_name: &str,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, AppError> {
        if !self.has_secret {
            error!("jwt signing secret is not configured");
            return Err(AppError::SigningFailure);
        }
        let Some(expires_at) = now.checked_add(self.ttl) else {
            error!(ttl = %self.ttl, "token expiry overflows the clock");
            return Err(AppError::SigningFailure);
        };
        let claims = Claims {
            sub: subject_id.to_string(),
            name: display_name.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode failed");
            AppError::SigningFailure
        })?;
        debug!(user_id = %subject_id, "jwt signed");
        Ok(IssuedToken { token, expires_at })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// Parse, verify and expiry-check in one step. Every failure collapses into
    /// `InvalidToken` so callers cannot tell expired from tampered.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, AppError> {
        if !self.has_secret {
            return Err(AppError::InvalidToken);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against the supplied clock, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                AppError::InvalidToken
            })?
            .claims;

        if now.unix_timestamp() >= claims.exp {
            debug!(user_id = %claims.sub, "jwt expired");
            return Err(AppError::InvalidToken);
        }
        debug!(user_id = %claims.sub, "jwt verified");
        Ok(claims)
    }
}
