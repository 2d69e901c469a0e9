//! One-shot buffer read for every stove on an Agua IOT account
//!
//! Logs in, lists devices and prints the decoded register values of each
//! one, sorted by register key. Meant for protocol debugging.

use agua_iot_rust::{logging, AguaIotClient, AguaIotConfig, Credentials};
use clap::Parser;
use tracing::error;

/// Command line arguments
#[derive(Parser)]
#[command(name = "agua-iot-read")]
#[command(about = "Read and decode device buffers from the Agua IOT cloud")]
#[command(version)]
struct Cli {
    /// Brand tenant key
    #[arg(short, long, env = "AGUA_IOT_BRAND", default_value = "evacalor")]
    brand: String,

    /// Account email address
    #[arg(short, long, env = "AGUA_IOT_EMAIL")]
    email: String,

    /// Account password
    #[arg(short, long, env = "AGUA_IOT_PASSWORD", hide_env_values = true)]
    password: String,

    /// Only print this register key (repeatable)
    #[arg(short, long)]
    register: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(logging::LogConfig::from_env()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let config = AguaIotConfig::for_brand(&cli.brand);
    let client = AguaIotClient::new(config, Credentials::new(cli.email, cli.password))?;

    let devices = client.list_devices().await?;
    if devices.is_empty() {
        println!("The account has no registered devices");
        return Ok(());
    }

    for device in &devices {
        println!("\n📟 {} ({})", device.display_name(), device.instance_key());

        let data = match client.read_device_data(device).await {
            Ok(data) => data,
            Err(e) => {
                error!("Read failed for {}: {e}", device.instance_key());
                continue;
            }
        };

        let mut entries: Vec<_> = data
            .iter()
            .filter(|(key, _)| cli.register.is_empty() || cli.register.iter().any(|r| r == *key))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (key, value) in entries {
            println!("   {key:<32} {value}");
        }
    }

    Ok(())
}
