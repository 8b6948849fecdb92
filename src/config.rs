use std::fmt::Display;
use std::str::FromStr;

const DEFAULT_ADMIN_EMAIL: &str = "admin@company.com";
const DEFAULT_ADMIN_PASSWORD: &str = "ChangeMe123";
const MIN_SECRET_LEN: usize = 32;
const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} missing")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: Vec<u8>,
    pub token_ttl_minutes: i64,
    pub bind_addr: String,
    pub max_connections: u32,
    pub admin_email: String,
    pub admin_password: String,
    pub login_attempts_per_minute: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("max_connections", &self.max_connections)
            .field("admin_email", &self.admin_email)
            .field("login_attempts_per_minute", &self.login_attempts_per_minute)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| {
            let port = get("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let token_ttl_minutes: i64 = parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 60)?;
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes) {
            return Err(ConfigError::Invalid {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_MINUTES}"),
            });
        }

        Ok(Self {
            database_url,
            jwt_secret: jwt_secret.into_bytes(),
            token_ttl_minutes,
            bind_addr,
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            admin_email: get("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            admin_password: get("ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            login_attempts_per_minute: parse_or(&get, "LOGIN_RATE_LIMIT", 5)?,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/awards"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.token_ttl_minutes, 60);
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.admin_email, "admin@company.com");
        assert_eq!(cfg.login_attempts_per_minute, 5);
    }

    #[test]
    fn port_is_used_when_bind_addr_absent() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/awards"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/awards"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_SECRET", .. }));
    }

    #[test]
    fn unparsable_number_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/awards"),
            ("JWT_SECRET", SECRET),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "ACCESS_TOKEN_EXPIRE_MINUTES", .. }
        ));
    }

    #[test]
    fn token_lifetime_is_bounded() {
        let with_ttl = |ttl: &'static str| {
            AppConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/awards"),
                ("JWT_SECRET", SECRET),
                ("ACCESS_TOKEN_EXPIRE_MINUTES", ttl),
            ]))
        };
        assert_eq!(with_ttl("525600").unwrap().token_ttl_minutes, 525_600);
        for bad in ["0", "-5", "525601", "4611686018427387903"] {
            assert!(
                matches!(
                    with_ttl(bad),
                    Err(ConfigError::Invalid { name: "ACCESS_TOKEN_EXPIRE_MINUTES", .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://user:pw@localhost/awards"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains(SECRET));
        assert!(!printed.contains("pw@"));
    }
}
