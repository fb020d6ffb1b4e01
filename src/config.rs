use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub secret_key: String,
    pub max_connections: u32,
    pub admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://blog.db".to_string());
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string());

        let secret_key = lookup("SECRET_KEY").context("SECRET_KEY must be set in .env")?;
        if secret_key.trim().is_empty() {
            bail!("SECRET_KEY must not be empty");
        }

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => {
                let value: u32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {raw}"))?;
                if value == 0 {
                    bail!("DB_MAX_CONNECTIONS must be at least 1");
                }
                value
            }
            None => 5,
        };

        let admin_email = lookup("ADMIN_EMAIL").filter(|email| !email.trim().is_empty());

        Ok(Self {
            database_url,
            bind_addr,
            secret_key,
            max_connections,
            admin_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.database_url, "sqlite://blog.db");
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.max_connections, 5);
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("SECRET_KEY", "  ")])).is_err());
    }

    #[test]
    fn max_connections_must_be_a_positive_number() {
        let bad = lookup_from(&[("SECRET_KEY", "k"), ("DB_MAX_CONNECTIONS", "lots")]);
        assert!(Config::from_lookup(bad).is_err());

        let zero = lookup_from(&[("SECRET_KEY", "k"), ("DB_MAX_CONNECTIONS", "0")]);
        assert!(Config::from_lookup(zero).is_err());

        let ok = lookup_from(&[("SECRET_KEY", "k"), ("DB_MAX_CONNECTIONS", " 12 ")]);
        assert_eq!(Config::from_lookup(ok).unwrap().max_connections, 12);
    }

    #[test]
    fn blank_admin_email_is_ignored() {
        let config =
            Config::from_lookup(lookup_from(&[("SECRET_KEY", "k"), ("ADMIN_EMAIL", "")])).unwrap();
        assert!(config.admin_email.is_none());
    }
}
