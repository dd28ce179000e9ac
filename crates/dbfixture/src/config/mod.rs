//! Configuration loading and validation.
//!
//! A YAML file names the driver, URL and TLS mode:
//!
//! ```yaml
//! driver: postgres
//! url: postgres://fixtures@localhost/test
//! ssl_mode: require
//! ```
//!
//! Command-line flags and environment variables override file values.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::{FixtureError, Result, ResultExt};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context("config", path.display())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration from an optional file plus overrides.
    ///
    /// Without a file, the overrides must supply both driver and URL.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let mut config = Self::load(path)?;
                config.apply(overrides);
                config
            }
            None => {
                let driver = overrides.driver.ok_or_else(|| {
                    FixtureError::BadArgs("a driver is required (--driver or config file)".into())
                })?;
                let url = overrides.url.ok_or_else(|| {
                    FixtureError::BadArgs("a url is required (--url or config file)".into())
                })?;
                Config {
                    driver,
                    url,
                    ssl_mode: overrides.ssl_mode.unwrap_or_default(),
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace file values with every override that is set.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(driver) = overrides.driver {
            self.driver = driver;
        }
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(ssl_mode) = overrides.ssl_mode {
            self.ssl_mode = ssl_mode;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// The URL with any password replaced, for logging.
    pub fn redacted_url(&self) -> String {
        redact_password(&self.url)
    }
}

fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &url[authority_start..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return url.to_string();
    };
    match rest[..at].find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..authority_start],
            &rest[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
