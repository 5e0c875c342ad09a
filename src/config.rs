// settings
use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_DATABASE_NAME: &str = "songs";
pub const DEFAULT_SEED_PATH: &str = "data/songs.json";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing database server in the {0} variable")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Everything the service reads from the environment, once, at startup.
#[derive(Clone)]
pub struct Settings {
    pub database_service: String,
    pub database_username: Option<String>,
    pub database_password: Option<String>,
    pub database_port: Option<u16>,
    pub database_name: String,
    pub seed_path: PathBuf,
    pub http_port: u16,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("database_service", &self.database_service)
            .field("database_username", &self.database_username)
            .field("database_password", &self.database_password.as_ref().map(|_| "***"))
            .field("database_port", &self.database_port)
            .field("database_name", &self.database_name)
            .field("seed_path", &self.seed_path)
            .field("http_port", &self.http_port)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_service =
            get("DATABASE_SERVICE").ok_or(ConfigError::Missing("DATABASE_SERVICE"))?;
        let database_port = get("DATABASE_PORT")
            .map(|v| parse_port("DATABASE_PORT", v))
            .transpose()?;
        let http_port = get("PORT")
            .map(|v| parse_port("PORT", v))
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_PORT);

        let settings = Settings {
            database_service,
            database_username: get("DATABASE_USERNAME"),
            database_password: get("DATABASE_PASSWORD"),
            database_port,
            database_name: get("DATABASE_NAME")
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            seed_path: get("SONGS_SEED_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_PATH)),
            http_port,
        };

        // Log which optional settings are configured (NOT their values!)
        let configured: Vec<&str> = [
            ("DATABASE_USERNAME", settings.database_username.is_some()),
            ("DATABASE_PASSWORD", settings.database_password.is_some()),
            ("DATABASE_PORT", settings.database_port.is_some()),
        ]
        .iter()
        .filter(|(_, set)| *set)
        .map(|(k, _)| *k)
        .collect();
        info!("Settings configured: {:?}", configured);

        Ok(settings)
    }

    /// Host part of the connection target. The port setting applies only
    /// when the service value does not already name one.
    pub fn database_host(&self) -> String {
        let service = self.database_service.as_str();
        let Some(port) = self.database_port else {
            return service.to_string();
        };
        if names_port(service) {
            return service.to_string();
        }
        // A bare IPv6 literal needs brackets before a port can follow it.
        if service.matches(':').count() > 1 {
            format!("[{}]:{}", service, port)
        } else {
            format!("{}:{}", service, port)
        }
    }

    pub fn database_url(&self) -> String {
        self.build_url(false)
    }

    /// Connection URL safe to log.
    pub fn redacted_database_url(&self) -> String {
        self.build_url(true)
    }

    fn build_url(&self, redact: bool) -> String {
        let host = self.database_host();
        match (&self.database_username, &self.database_password) {
            (Some(user), Some(password)) => {
                let password = if redact {
                    "***".to_string()
                } else {
                    urlencoding::encode(password).into_owned()
                };
                format!(
                    "postgres://{}:{}@{}/{}",
                    urlencoding::encode(user),
                    password,
                    host,
                    self.database_name
                )
            }
            _ => format!("postgres://{}/{}", host, self.database_name),
        }
    }
}

/// Whether `service` ends in `:port`. For `[v6]` literals only text after
/// the closing bracket counts.
fn names_port(service: &str) -> bool {
    match service.rfind(']') {
        Some(end) => service[end + 1..].starts_with(':'),
        None => service.matches(':').count() == 1,
    }
}

fn parse_port(var: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn service_is_required() {
        assert_eq!(
            settings(&[]).unwrap_err(),
            ConfigError::Missing("DATABASE_SERVICE")
        );
        assert_eq!(
            settings(&[("DATABASE_SERVICE", "  ")]).unwrap_err(),
            ConfigError::Missing("DATABASE_SERVICE")
        );
    }

    #[test]
    fn defaults_apply() {
        let s = settings(&[("DATABASE_SERVICE", "db")]).unwrap();
        assert_eq!(s.database_name, "songs");
        assert_eq!(s.seed_path, PathBuf::from("data/songs.json"));
        assert_eq!(s.http_port, 8080);
        assert_eq!(s.database_url(), "postgres://db/songs");
    }

    #[test]
    fn credentials_need_both_halves() {
        let s = settings(&[("DATABASE_SERVICE", "db"), ("DATABASE_USERNAME", "u")]).unwrap();
        assert_eq!(s.database_url(), "postgres://db/songs");

        let s = settings(&[
            ("DATABASE_SERVICE", "db"),
            ("DATABASE_USERNAME", "u"),
            ("DATABASE_PASSWORD", "p@ss/word"),
        ])
        .unwrap();
        assert_eq!(s.database_url(), "postgres://u:p%40ss%2Fword@db/songs");
        assert_eq!(s.redacted_database_url(), "postgres://u:***@db/songs");
    }

    #[test]
    fn port_is_appended_unless_service_names_one() {
        let s = settings(&[("DATABASE_SERVICE", "db"), ("DATABASE_PORT", "5433")]).unwrap();
        assert_eq!(s.database_url(), "postgres://db:5433/songs");

        let s = settings(&[("DATABASE_SERVICE", "db:6000"), ("DATABASE_PORT", "5433")]).unwrap();
        assert_eq!(s.database_url(), "postgres://db:6000/songs");
    }

    #[test]
    fn port_is_appended_to_ipv6_literals() {
        let s = settings(&[("DATABASE_SERVICE", "[::1]"), ("DATABASE_PORT", "5433")]).unwrap();
        assert_eq!(s.database_url(), "postgres://[::1]:5433/songs");

        let s = settings(&[("DATABASE_SERVICE", "[::1]:6000"), ("DATABASE_PORT", "5433")]).unwrap();
        assert_eq!(s.database_url(), "postgres://[::1]:6000/songs");

        let s = settings(&[("DATABASE_SERVICE", "fd00::7"), ("DATABASE_PORT", "5433")]).unwrap();
        assert_eq!(s.database_url(), "postgres://[fd00::7]:5433/songs");

        let s = settings(&[("DATABASE_SERVICE", "[::1]")]).unwrap();
        assert_eq!(s.database_url(), "postgres://[::1]/songs");
    }

    #[test]
    fn bad_ports_are_rejected() {
        let err = settings(&[("DATABASE_SERVICE", "db"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid { var: "PORT", value: "eighty".to_string() }
        );
    }

    #[test]
    fn debug_hides_password() {
        let s = settings(&[
            ("DATABASE_SERVICE", "db"),
            ("DATABASE_USERNAME", "u"),
            ("DATABASE_PASSWORD", "secret"),
        ])
        .unwrap();
        assert!(!format!("{:?}", s).contains("secret"));
    }
}
