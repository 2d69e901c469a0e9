//! Agua IOT cloud client for networked pellet stoves
//!
//! This crate talks to the Agua IOT platform that backs the mobile apps of
//! many pellet stove brands (Evacalor, Piazzetta, Ravelli and others). It
//! covers the full remote-control protocol: account signup and login,
//! device listing, registers-map discovery, buffer reads and register
//! writes through the platform's asynchronous job queue.
//!
//! # Features
//!
//! - Token-based authentication with automatic re-login on expiry
//! - Device discovery for every stove on the account
//! - Registers-map retrieval with per-device caching
//! - Buffer decoding with bit masks and per-register scaling formulas
//! - Register writes using each register's inverse formula
//! - Power on/off helpers built on the managed status register
//! - 30 brand tenants preconfigured, custom tenants via overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use agua_iot_rust::{AguaIotClient, AguaIotConfig, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AguaIotConfig::for_brand("evacalor");
//!     let credentials = Credentials::new("user@example.com", "secret");
//!     let client = AguaIotClient::new(config, credentials)?;
//!
//!     for device in client.list_devices().await? {
//!         let data = client.read_device_data(&device).await?;
//!         println!("{}: {:?}", device.display_name(), data.get("temp_air_get"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod brands;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod registers;

// Re-export main types
pub use crate::{
    client::jobs::JobStatus,
    client::{AguaIotClient, AguaIotDevice, ClientContext},
    config::{AguaIotConfig, Credentials},
    error::{AguaIotError, Result},
    registers::codec::DeviceData,
    registers::{RegisterDescriptor, RegistersMap},
};
