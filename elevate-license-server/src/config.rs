//! Server configuration loaded from the environment.

use elevate_license::{Keyring, LicenseError, LicenseResult, LicenseSecret};
use tracing::warn;

/// Secret used when `LICENSE_SECRET` is unset outside production.
pub const DEV_LICENSE_SECRET: &str = "elevate-dev-license-secret-do-not-use";

pub const ENV_LICENSE_SECRET: &str = "LICENSE_SECRET";
pub const ENV_LICENSE_SECRET_PREVIOUS: &str = "LICENSE_SECRET_PREVIOUS";
pub const ENV_ADMIN_API_KEY: &str = "ADMIN_API_KEY";
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_NODE_ENV: &str = "NODE_ENV";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub keyring: Keyring,
    pub admin_api_key: Option<String>,
    pub production: bool,
    /// True when the development fallback secret is in use.
    pub using_dev_secret: bool,
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> LicenseResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if `LICENSE_SECRET` is missing in production.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LicenseResult<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let production = get(ENV_APP_ENV)
            .or_else(|| get(ENV_NODE_ENV))
            .is_some_and(|env| env.trim().eq_ignore_ascii_case("production"));

        let (primary, using_dev_secret) = match get(ENV_LICENSE_SECRET) {
            Some(secret) => (LicenseSecret::new(secret)?, false),
            None if production => {
                return Err(LicenseError::Config(format!(
                    "{ENV_LICENSE_SECRET} must be set in production"
                )));
            }
            None => {
                warn!("{ENV_LICENSE_SECRET} not set, using insecure development secret");
                (LicenseSecret::new(DEV_LICENSE_SECRET)?, true)
            }
        };

        let previous = get(ENV_LICENSE_SECRET_PREVIOUS)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(LicenseSecret::new)
                    .collect::<LicenseResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            keyring: Keyring::new(primary).with_previous(previous),
            admin_api_key: get(ENV_ADMIN_API_KEY),
            production,
            using_dev_secret,
        })
    }
}
