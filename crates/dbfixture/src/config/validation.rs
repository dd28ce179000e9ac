//! Configuration validation.

use super::Config;
use crate::drivers::DriverKind;
use crate::error::{FixtureError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let url = config.url.trim();
    if url.is_empty() {
        return Err(FixtureError::BadArgs("url is required".into()));
    }

    match config.driver {
        DriverKind::Sqlite => {
            if !(url.starts_with("sqlite:") || url.ends_with(".db") || url.ends_with(".sqlite")) {
                return Err(FixtureError::BadArgs(format!(
                    "sqlite url must start with 'sqlite:', got '{}'",
                    url
                )));
            }
        }
        DriverKind::Mysql => {
            if !url.starts_with("mysql://") {
                return Err(FixtureError::BadArgs(
                    "mysql url must start with 'mysql://'".into(),
                ));
            }
        }
        // tokio-postgres also takes key/value connection strings.
        DriverKind::Postgres | DriverKind::Spanner => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::SslMode;

    fn config(driver: DriverKind, url: &str) -> Config {
        Config {
            driver,
            url: url.to_string(),
            ssl_mode: SslMode::Disable,
        }
    }

    #[test]
    fn test_valid_configs() {
        assert!(validate(&config(DriverKind::Sqlite, "sqlite::memory:")).is_ok());
        assert!(validate(&config(DriverKind::Sqlite, "fixtures.db")).is_ok());
        assert!(validate(&config(DriverKind::Mysql, "mysql://root@localhost/test")).is_ok());
        assert!(validate(&config(DriverKind::Postgres, "host=localhost user=postgres")).is_ok());
        assert!(validate(&config(DriverKind::Spanner, "postgres://localhost:5432/db")).is_ok());
    }

    #[test]
    fn test_empty_url_rejected() {
        let err = validate(&config(DriverKind::Postgres, "  ")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("url is required"));
    }

    #[test]
    fn test_url_scheme_must_match_driver() {
        assert!(validate(&config(DriverKind::Mysql, "postgres://localhost/db")).is_err());
        assert!(validate(&config(DriverKind::Sqlite, "mysql://localhost/db")).is_err());
    }
}
