//! Account credentials for the Agua IOT cloud

use crate::error::{AguaIotError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Agua IOT account credentials
///
/// The platform authenticates with the email/password pair registered in the
/// vendor app. `Debug` masks the password so credentials can appear in traces.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email address
    pub email: String,

    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials from an email/password pair
    pub fn new<S: Into<String>>(email: S, password: S) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Load credentials from `AGUA_IOT_EMAIL` / `AGUA_IOT_PASSWORD`
    pub fn from_env() -> Result<Self> {
        let email = env::var("AGUA_IOT_EMAIL")
            .map_err(|_| AguaIotError::config("AGUA_IOT_EMAIL not set"))?;
        let password = env::var("AGUA_IOT_PASSWORD")
            .map_err(|_| AguaIotError::config("AGUA_IOT_PASSWORD not set"))?;
        Ok(Self { email, password })
    }

    /// Validate credentials
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(AguaIotError::config("Email cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(AguaIotError::config("Password cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}
