//! Backend selection.

use std::str::FromStr;

use strum::EnumString;

/// Deployment environment the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Staging backend, for development and review builds.
    Staging,
    /// Production backend.
    Production,
}

/// Client configuration: where the backend lives.
///
/// Built from an [`Environment`] for real clients, or from an explicit base
/// URL for tests against a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    base_url: String,
}

impl Config {
    /// Configuration for a deployment environment.
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        let base_url = match environment {
            Environment::Staging => "https://api.stage.factkit.org",
            Environment::Production => "https://api.factkit.org",
        }
        .to_string();
        Self { base_url }
    }

    /// Configuration pointing at an explicit base URL. Trailing slashes are
    /// trimmed so path joining stays uniform.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The backend base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl FromStr for Config {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_environment(&Environment::from_str(s)?))
    }
}
