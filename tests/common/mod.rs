//! Shared wiremock scaffolding for the integration tests
//!
//! Provides a mock Agua IOT backend plus config, credential and fixture
//! helpers so each test only mounts the endpoints it cares about.

#![allow(dead_code)]

use agua_iot_rust::{AguaIotClient, AguaIotConfig, AguaIotDevice, Credentials};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// App-instance id every test client uses, so header matchers can pin it
pub const TEST_CLIENT_ID: &str = "11111111-2222-4333-8444-555555555555";

/// Mock Agua IOT backend
pub struct MockAguaServer {
    pub server: MockServer,
}

impl MockAguaServer {
    /// Start a bare mock server; tests mount the endpoints they need
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a server with the signup and login handshake already mocked
    pub async fn start_logged_in() -> Self {
        let mock = Self::start().await;
        mock.mock_signup().await;
        mock.mock_login(&fresh_token()).await;
        mock
    }

    /// Base URL of the mock server
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Mount a custom mock
    pub async fn add_mock(&self, mock: Mock) {
        mock.mount(&self.server).await;
    }

    /// Mount `/appSignup`
    pub async fn mock_signup(&self) {
        Mock::given(method("POST"))
            .and(path("/appSignup"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&self.server)
            .await;
    }

    /// Mount `/userLogin` handing out the given token
    pub async fn mock_login(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/userLogin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": token,
                "refresh_token": "refresh-token-1",
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount `/deviceGetRegistersMap` answering with the given variants
    pub async fn mock_registers_map(&self, variants: Value) {
        Mock::given(method("POST"))
            .and(path("/deviceGetRegistersMap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_registers_map": { "registers_map": variants }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a job submission endpoint answering with the given job id
    pub async fn mock_job_submission(&self, endpoint: &str, job_id: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "idRequest": job_id })))
            .mount(&self.server)
            .await;
    }

    /// Mount a completed job status carrying the given answer data
    pub async fn mock_job_completed(&self, job_id: &str, answer: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/deviceJobStatus/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobAnswerStatus": "completed",
                "jobAnswerData": answer,
            })))
            .mount(&self.server)
            .await;
    }
}

/// Sign a throwaway JWT whose `exp` claim is the given epoch second
pub fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"test","exp":{exp}}}"#));
    format!("{header}.{claims}.signature")
}

/// Token that stays valid for the whole test run
pub fn fresh_token() -> String {
    jwt_with_exp(chrono::Utc::now().timestamp() + 3600)
}

/// Config pointing the client at the mock server, with fast job polling
pub fn test_config(mock_uri: &str) -> AguaIotConfig {
    let mut config = AguaIotConfig::for_brand("evacalor");
    config.api_url = Some(mock_uri.parse().expect("mock server uri"));
    config.client_id = Some(TEST_CLIENT_ID.to_string());
    config.timeout = Duration::from_secs(5);
    config.job_poll_interval = Duration::from_millis(10);
    config.job_poll_attempts = 3;
    config
}

/// Account credentials the mocks accept
pub fn test_credentials() -> Credentials {
    Credentials::new("user@example.com", "secret")
}

/// Client wired to the mock server
pub fn test_client(mock: &MockAguaServer) -> AguaIotClient {
    AguaIotClient::new(test_config(&mock.uri()), test_credentials()).expect("client should build")
}

/// One stove, as `deviceList` would describe it
pub fn test_device() -> AguaIotDevice {
    AguaIotDevice {
        id: Some(json!(1)),
        id_device: json!("B111"),
        id_product: json!(5),
        product_serial: Some("SN-0001".to_string()),
        name: Some("Living room stove".to_string()),
        is_online: true,
        name_product: Some("Stove 9000".to_string()),
        id_registers_map: None,
    }
}

/// Single-variant registers map with the registers most tests read and write
pub fn default_map_variants() -> Value {
    json!([
        {
            "id": 2,
            "registers": [
                {
                    "reg_key": "temp_air_get",
                    "offset": 10,
                    "mask": 255,
                    "formula": "#/2",
                    "formula_inverse": "#*2"
                },
                {
                    "reg_key": "temp_air_set",
                    "offset": 12,
                    "mask": 255,
                    "formula": "#/2",
                    "formula_inverse": "#*2",
                    "set_min": 15,
                    "set_max": 30
                },
                {
                    "reg_key": "status_managed_get",
                    "offset": 0,
                    "mask": 65535,
                    "enc_val": [
                        { "lang": "ENG", "description": "ON", "value": 1 },
                        { "lang": "ENG", "description": "OFF", "value": 0 }
                    ]
                }
            ]
        }
    ])
}
