//! HTTP transport for the Agua IOT platform
//!
//! Every call carries the same brand headers; authentication is layered on
//! top by the session module through per-request extra headers. Non-success
//! statuses become [`AguaIotError::HttpStatus`] with a truncated body
//! snippet, connect and timeout failures become [`AguaIotError::Transport`].

use crate::config::AguaIotConfig;
use crate::error::{AguaIotError, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// App signup handshake, performed before every login
pub const PATH_APP_SIGNUP: &str = "/appSignup";
/// Email/password login
pub const PATH_LOGIN: &str = "/userLogin";
/// Token refresh; reserved, the platform's own app re-logs-in instead
pub const PATH_REFRESH_TOKEN: &str = "/refreshToken";
/// Account device listing
pub const PATH_DEVICE_LIST: &str = "/deviceList";
/// Per-device info, carries the `id_registers_map` hint
pub const PATH_DEVICE_INFO: &str = "/deviceGetInfo";
/// Registers map download
pub const PATH_DEVICE_REGISTERS_MAP: &str = "/deviceGetRegistersMap";
/// Buffer read job submission
pub const PATH_DEVICE_BUFFER_READING: &str = "/deviceGetBufferReading";
/// Register write job submission
pub const PATH_DEVICE_WRITING: &str = "/deviceRequestWriting";
/// Job status; the job id is appended to this prefix
pub const PATH_DEVICE_JOB_STATUS: &str = "/deviceJobStatus/";

const ACCEPT_VALUE: &str = "application/json, text/javascript, */*; q=0.01";

/// Longest response-body snippet carried into an HTTP status error
const ERROR_BODY_LIMIT: usize = 300;

/// HTTP transport bound to one brand tenant
#[derive(Debug)]
pub struct Transport {
    client: reqwest::Client,
    api_base: Url,
    login_base: Url,
    brand_id: String,
    customer_code: String,
}

impl Transport {
    /// Create a transport from a validated configuration
    pub fn new(config: &AguaIotConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AguaIotError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: with_trailing_slash(config.api_base()?),
            login_base: with_trailing_slash(config.login_base()?),
            brand_id: config.brand_id.clone(),
            customer_code: config.customer_code()?,
        })
    }

    /// Send a request to the brand's API base
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let url = join_path(&self.api_base, path)?;
        self.execute(method, url, body, extra_headers).await
    }

    /// Send a request to the brand's login base
    ///
    /// Identical to [`request`](Self::request) except for the base URL; only
    /// the login call is routed here, so brands with a dedicated login
    /// bridge (MyPiazzetta) still make all device calls on the API base.
    pub async fn login_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let url = join_path(&self.login_base, path)?;
        self.execute(method, url, body, extra_headers).await
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        debug!("API request: {method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Accept", ACCEPT_VALUE)
            .header("Origin", "file://")
            .header("id_brand", &self.brand_id)
            .header("customer_code", &self.customer_code);

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AguaIotError::transport(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                AguaIotError::transport(format!("HTTP request failed: {e}"))
            } else {
                AguaIotError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!("API response: {status} ({} bytes)", text.len());

        if !status.is_success() {
            let snippet: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(AguaIotError::http_status(status.as_u16(), snippet));
        }

        Ok(parse_response(&text))
    }
}

/// Parse a response body: JSON when it parses, the raw text otherwise
///
/// A handful of endpoints (the signup handshake among them) answer with
/// empty or non-JSON bodies on success.
fn parse_response(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => Value::String(text.to_string()),
    }
}

/// Resolve an endpoint path against a base, keeping the base's own path
///
/// Login bridges carry a path of their own
/// (`.../api/bridge/endpoint/` + `userLogin`), so the endpoint is appended
/// rather than resolved absolutely.
fn join_path(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AguaIotError::config(format!("Invalid request URL for {path}: {e}")))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_falls_back_to_text() {
        assert_eq!(
            parse_response(r#"{"token": "abc"}"#),
            json!({"token": "abc"})
        );
        assert_eq!(parse_response("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_response("42"), json!(42));
        assert_eq!(parse_response("registered"), json!("registered"));
        assert_eq!(parse_response(""), json!(""));
    }

    #[test]
    fn test_join_path_on_bare_host() {
        let base = with_trailing_slash("https://evastampaggi.agua-iot.com".parse().unwrap());
        let url = join_path(&base, PATH_LOGIN).unwrap();
        assert_eq!(url.as_str(), "https://evastampaggi.agua-iot.com/userLogin");
    }

    #[test]
    fn test_join_path_keeps_bridge_prefix() {
        let base = with_trailing_slash(
            "https://piazzetta-iot.app2cloud.it/api/bridge/endpoint/"
                .parse()
                .unwrap(),
        );
        let url = join_path(&base, PATH_LOGIN).unwrap();
        assert_eq!(
            url.as_str(),
            "https://piazzetta-iot.app2cloud.it/api/bridge/endpoint/userLogin"
        );
    }

    #[test]
    fn test_join_path_appends_job_ids() {
        let base = with_trailing_slash("https://evastampaggi.agua-iot.com".parse().unwrap());
        let url = join_path(&base, &format!("{PATH_DEVICE_JOB_STATUS}0123-abcd")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://evastampaggi.agua-iot.com/deviceJobStatus/0123-abcd"
        );
    }

    #[test]
    fn test_trailing_slash_is_idempotent() {
        let url: Url = "https://host.example/api/".parse().unwrap();
        assert_eq!(with_trailing_slash(url.clone()), url);
    }
}
