use std::{env, net::SocketAddr};

use thiserror::Error;

use crate::jmap::DEFAULT_MAX_CALLS_IN_REQUEST;
use crate::model::Id;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub max_calls_in_request: usize,
    pub account_id: Id,
    pub username: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JMAP_API_TOKEN is required and must not be empty")]
    MissingApiToken,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("JMAP_MAX_CALLS_IN_REQUEST must be a positive integer")]
    InvalidMaxCalls,
    #[error("JMAP_ACCOUNT_ID is not a valid id: {0}")]
    InvalidAccountId(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_token = non_empty("JMAP_API_TOKEN").ok_or(ConfigError::MissingApiToken)?;

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let max_calls_in_request = non_empty("JMAP_MAX_CALLS_IN_REQUEST")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|max| *max >= 1)
                    .ok_or(ConfigError::InvalidMaxCalls)
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_CALLS_IN_REQUEST);

        let account_id = non_empty("JMAP_ACCOUNT_ID")
            .map(|value| Id::new(value).map_err(ConfigError::InvalidAccountId))
            .transpose()?
            .unwrap_or_else(|| Id::new_unchecked("primary".to_string()));

        let username = non_empty("JMAP_USERNAME").unwrap_or_else(|| "user@localhost".to_string());

        let config = Self {
            api_token,
            bind_addr,
            bind_port,
            max_calls_in_request,
            account_id,
            username,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = parse(&[("JMAP_API_TOKEN", "abc")]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.max_calls_in_request, 16);
        assert_eq!(config.account_id.as_str(), "primary");
        assert_eq!(config.username, "user@localhost");
    }

    #[test]
    fn missing_token_fails() {
        let err = parse(&[("JMAP_API_TOKEN", "   ")]).expect_err("expected missing token error");
        assert!(matches!(err, ConfigError::MissingApiToken));
    }

    #[test]
    fn overrides_apply() {
        let config = parse(&[
            ("JMAP_API_TOKEN", "abc"),
            ("BIND_ADDR", "0.0.0.0"),
            ("BIND_PORT", "9000"),
            ("JMAP_MAX_CALLS_IN_REQUEST", "4"),
            ("JMAP_ACCOUNT_ID", "acct-7"),
            ("JMAP_USERNAME", "alice@example.com"),
        ])
        .expect("config should parse");

        assert_eq!(config.bind_socket().expect("socket").port(), 9000);
        assert_eq!(config.max_calls_in_request, 4);
        assert_eq!(config.account_id.as_str(), "acct-7");
        assert_eq!(config.username, "alice@example.com");
    }

    #[test]
    fn invalid_values_fail() {
        assert!(matches!(
            parse(&[("JMAP_API_TOKEN", "abc"), ("BIND_PORT", "http")]),
            Err(ConfigError::InvalidPort)
        ));
        assert!(matches!(
            parse(&[("JMAP_API_TOKEN", "abc"), ("JMAP_MAX_CALLS_IN_REQUEST", "0")]),
            Err(ConfigError::InvalidMaxCalls)
        ));
        assert!(matches!(
            parse(&[("JMAP_API_TOKEN", "abc"), ("JMAP_ACCOUNT_ID", "not an id")]),
            Err(ConfigError::InvalidAccountId(_))
        ));
        assert!(matches!(
            parse(&[("JMAP_API_TOKEN", "abc"), ("BIND_ADDR", "not-an-address")]),
            Err(ConfigError::InvalidSocket)
        ));
    }
}
