use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Fixed operator identity reachable through the `Basic` scheme.
///
/// Local/test use only. Off unless `DEBUG_BASIC_AUTH=true`, and never active
/// in a release build regardless of the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugAuthConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

impl DebugAuthConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            username: "admin".into(),
            password: "password".into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && cfg!(debug_assertions)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub debug_auth: DebugAuthConfig,
}

const DEFAULT_TTL_HOURS: i64 = 24;
/// Upper bound on token lifetime, one year.
const MAX_TTL_HOURS: i64 = 24 * 366;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let ttl_hours = match lookup("JWT_TTL_HOURS") {
            None => DEFAULT_TTL_HOURS,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("JWT_TTL_HOURS is not an integer: {raw}"))?,
        };
        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            anyhow::bail!("JWT_TTL_HOURS must be between 1 and {MAX_TTL_HOURS}, got {ttl_hours}");
        }
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            ttl_hours,
        };
        let defaults = DebugAuthConfig::disabled();
        let debug_auth = DebugAuthConfig {
            enabled: lookup("DEBUG_BASIC_AUTH")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            username: lookup("DEBUG_BASIC_USER").unwrap_or(defaults.username),
            password: lookup("DEBUG_BASIC_PASSWORD").unwrap_or(defaults.password),
        };
        if debug_auth.enabled && !debug_auth.is_active() {
            tracing::warn!("DEBUG_BASIC_AUTH ignored in release build");
        }
        Ok(Self {
            database_url,
            jwt,
            debug_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn debug_auth_is_off_by_default() {
        let cfg = DebugAuthConfig::disabled();
        assert!(!cfg.enabled);
        assert!(!cfg.is_active());
    }

    #[test]
    fn debug_auth_follows_build_profile_when_enabled() {
        let cfg = DebugAuthConfig {
            enabled: true,
            ..DebugAuthConfig::disabled()
        };
        assert_eq!(cfg.is_active(), cfg!(debug_assertions));
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/users"),
        ("JWT_SECRET", "s"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(cfg.jwt.ttl_hours, 24);
        assert!(!cfg.debug_auth.enabled);
        assert_eq!(cfg.debug_auth.username, "admin");
        assert_eq!(cfg.debug_auth.password, "password");
    }

    #[test]
    fn debug_toggle_accepts_true_and_one_only() {
        for (raw, expected) in [("true", true), ("1", true), ("yes", false), ("TRUE", false)] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("DEBUG_BASIC_AUTH", raw));
            pairs.push(("DEBUG_BASIC_USER", "ops"));
            let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
            assert_eq!(cfg.debug_auth.enabled, expected, "DEBUG_BASIC_AUTH={raw}");
            assert_eq!(cfg.debug_auth.username, "ops");
        }
    }

    #[test]
    fn ttl_must_be_a_positive_bounded_integer() {
        for raw in ["0", "-3", "100000000", "soon"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("JWT_TTL_HOURS", raw));
            assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err(), "JWT_TTL_HOURS={raw}");
        }
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("JWT_TTL_HOURS", "2"));
        assert_eq!(AppConfig::from_lookup(lookup_from(&pairs)).unwrap().jwt.ttl_hours, 2);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let pairs = [("DATABASE_URL", "postgres://localhost/users")];
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }
}
