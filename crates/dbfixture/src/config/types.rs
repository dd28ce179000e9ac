//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::drivers::{DriverKind, SslMode};

/// Root configuration: which database to talk to and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database engine.
    pub driver: DriverKind,

    /// Connection URL in the driver's native format.
    pub url: String,

    /// TLS mode (default: disable). Ignored by SQLite.
    #[serde(default)]
    pub ssl_mode: SslMode,
}

/// Values given on the command line or in the environment. Each one that is
/// set replaces the file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub driver: Option<DriverKind>,
    pub url: Option<String>,
    pub ssl_mode: Option<SslMode>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.driver.is_none() && self.url.is_none() && self.ssl_mode.is_none()
    }
}
