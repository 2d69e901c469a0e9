//! Configuration management for the Agua IOT client

pub mod credentials;

use crate::brands;
use crate::error::{AguaIotError, Result};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use url::Url;

pub use credentials::Credentials;

/// Client configuration
///
/// The `brand` key selects an entry from the brand registry; the optional
/// URL and customer-code fields override the registry values, which is how
/// self-hosted bridges and test servers are wired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AguaIotConfig {
    /// Brand registry key (e.g. "evacalor", "piazzetta")
    pub brand: String,

    /// Value for the `id_brand` header; the platform expects "1"
    pub brand_id: String,

    /// Override for the registry's customer code
    #[serde(default)]
    pub customer_code: Option<String>,

    /// Override for the registry's API base URL
    #[serde(default)]
    pub api_url: Option<Url>,

    /// Override for the login base URL (defaults to the brand's, then the API base)
    #[serde(default)]
    pub login_api_url: Option<Url>,

    /// Stable app-instance identifier; generated per client when unset
    #[serde(default)]
    pub client_id: Option<String>,

    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay between job status polls
    #[serde(with = "humantime_serde")]
    pub job_poll_interval: Duration,

    /// Maximum number of job status polls per write or read request
    pub job_poll_attempts: u32,
}

impl Default for AguaIotConfig {
    fn default() -> Self {
        Self {
            brand: "evacalor".to_string(),
            brand_id: "1".to_string(),
            customer_code: None,
            api_url: None,
            login_api_url: None,
            client_id: None,
            timeout: Duration::from_secs(15),
            job_poll_interval: Duration::from_secs(1),
            job_poll_attempts: 10,
        }
    }
}

impl AguaIotConfig {
    /// Create a configuration for a registry brand
    pub fn for_brand<S: Into<String>>(brand: S) -> Self {
        Self {
            brand: brand.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(brand) = env::var("AGUA_IOT_BRAND") {
            config.brand = brand;
        }

        if let Ok(brand_id) = env::var("AGUA_IOT_BRAND_ID") {
            config.brand_id = brand_id;
        }

        if let Ok(code) = env::var("AGUA_IOT_CUSTOMER_CODE") {
            config.customer_code = Some(code);
        }

        if let Ok(url) = env::var("AGUA_IOT_API_URL") {
            config.api_url = Some(
                url.parse()
                    .map_err(|e| AguaIotError::config(format!("Invalid AGUA_IOT_API_URL: {e}")))?,
            );
        }

        if let Ok(url) = env::var("AGUA_IOT_LOGIN_API_URL") {
            config.login_api_url = Some(url.parse().map_err(|e| {
                AguaIotError::config(format!("Invalid AGUA_IOT_LOGIN_API_URL: {e}"))
            })?);
        }

        if let Ok(client_id) = env::var("AGUA_IOT_CLIENT_ID") {
            config.client_id = Some(client_id);
        }

        if let Ok(timeout) = env::var("AGUA_IOT_TIMEOUT") {
            config.timeout = parse_duration_var("AGUA_IOT_TIMEOUT", &timeout)?;
        }

        if let Ok(interval) = env::var("AGUA_IOT_JOB_POLL_INTERVAL") {
            config.job_poll_interval = parse_duration_var("AGUA_IOT_JOB_POLL_INTERVAL", &interval)?;
        }

        if let Ok(attempts) = env::var("AGUA_IOT_JOB_POLL_ATTEMPTS") {
            config.job_poll_attempts = attempts.parse().map_err(|e| {
                AguaIotError::config(format!("Invalid AGUA_IOT_JOB_POLL_ATTEMPTS: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if brands::get(&self.brand).is_none()
            && (self.api_url.is_none() || self.customer_code.is_none())
        {
            return Err(AguaIotError::config(format!(
                "Unknown brand '{}': set api_url and customer_code to use an unlisted brand",
                self.brand
            )));
        }

        if self.timeout.is_zero() {
            return Err(AguaIotError::config("Timeout must be greater than zero"));
        }

        if self.job_poll_attempts == 0 {
            return Err(AguaIotError::config(
                "job_poll_attempts must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Base URL for API calls: the explicit override, or the brand's tenant URL
    pub fn api_base(&self) -> Result<Url> {
        if let Some(url) = &self.api_url {
            return Ok(url.clone());
        }

        let brand = brands::get(&self.brand).ok_or_else(|| {
            AguaIotError::config(format!("Unknown brand '{}' and no api_url set", self.brand))
        })?;
        brand
            .api_url
            .parse()
            .map_err(|e| AguaIotError::config(format!("Invalid brand API URL: {e}")))
    }

    /// Base URL for the login call
    ///
    /// Falls back to [`api_base`](Self::api_base) for the many brands without
    /// a dedicated login bridge.
    pub fn login_base(&self) -> Result<Url> {
        if let Some(url) = &self.login_api_url {
            return Ok(url.clone());
        }

        if let Some(brand) = brands::get(&self.brand) {
            if let Some(login_url) = brand.login_api_url {
                return login_url
                    .parse()
                    .map_err(|e| AguaIotError::config(format!("Invalid brand login URL: {e}")));
            }
        }

        self.api_base()
    }

    /// Tenant identifier sent as the `customer_code` header
    pub fn customer_code(&self) -> Result<String> {
        if let Some(code) = &self.customer_code {
            return Ok(code.clone());
        }

        brands::get(&self.brand)
            .map(|b| b.customer_code.to_string())
            .ok_or_else(|| {
                AguaIotError::config(format!(
                    "Unknown brand '{}' and no customer_code set",
                    self.brand
                ))
            })
    }
}

/// Parse a duration environment variable, accepting bare seconds (`"15"`)
/// or a humantime string (`"15s"`, `"500ms"`)
fn parse_duration_var(name: &str, raw: &str) -> Result<Duration> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .or_else(|_| humantime::parse_duration(raw))
        .map_err(|e| AguaIotError::config(format!("Invalid {name}: {e}")))
}
