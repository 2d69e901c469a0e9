//! Verify an Agua IOT account against its brand cloud
//!
//! Signs up the app instance, logs in and lists the account's devices.
//! Good first check that the chosen brand and credentials work before
//! wiring the client into an application.

use agua_iot_rust::{brands, logging, AguaIotClient, AguaIotConfig, Credentials};
use clap::Parser;
use std::io::{self, Write};
use tracing::warn;

/// Command line arguments
#[derive(Parser)]
#[command(name = "agua-iot-verify")]
#[command(about = "Verify an Agua IOT account and list its devices")]
#[command(version)]
struct Cli {
    /// Brand tenant key (see --list-brands)
    #[arg(short, long, env = "AGUA_IOT_BRAND", default_value = "evacalor")]
    brand: String,

    /// Account email address (prompted when omitted)
    #[arg(short, long, env = "AGUA_IOT_EMAIL")]
    email: Option<String>,

    /// Account password (prompted when omitted)
    #[arg(short, long, env = "AGUA_IOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the known brand tenants and exit
    #[arg(long)]
    list_brands: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(logging::LogConfig::from_env()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if cli.list_brands {
        println!("Known brand tenants:\n");
        for (key, brand) in brands::all() {
            println!("  {key:<18} {}", brand.name);
        }
        return Ok(());
    }

    println!("\n🔍 Agua IOT Account Verification");
    println!("========================================\n");

    let email = match cli.email {
        Some(email) => email,
        None => read_line_input("Email: ")?,
    };
    let password = match cli.password {
        Some(password) => password,
        None => read_password_input()?,
    };

    let config = AguaIotConfig::for_brand(&cli.brand);
    let client = AguaIotClient::new(config, Credentials::new(email.clone(), password))?;

    println!("🔗 Verifying against:");
    println!("   Brand: {}", cli.brand);
    println!("   API:   {}", client.config().api_base()?);
    println!("   User:  {email}");
    println!("   Pass:  ***");
    println!();

    println!("🔐 Logging in...");
    client.authenticate().await?;
    println!("✅ Login succeeded");

    let state = client.session_state().await;
    if let Some(expires_at) = state.expires_at_ms {
        if let Some(when) = chrono::DateTime::from_timestamp_millis(expires_at) {
            println!("   Token valid until {when}");
        }
    }

    println!("\n📟 Listing devices...");
    let devices = client.list_devices().await?;
    if devices.is_empty() {
        println!("⚠️  The account has no registered devices");
        return Ok(());
    }

    for device in &devices {
        let online = if device.is_online { "online" } else { "offline" };
        println!("   {} [{online}]", device.display_name());
        if let Some(serial) = &device.product_serial {
            println!("      serial {serial}");
        }

        match client.registers_map_for(device).await {
            Ok(map) => println!("      {} registers in map", map.len()),
            Err(e) => warn!(
                "Could not fetch registers map for {}: {e}",
                device.instance_key()
            ),
        }
    }

    println!("\n✅ Verification complete!");
    Ok(())
}

/// Read one line from stdin
fn read_line_input(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Read a password without echoing it
fn read_password_input() -> anyhow::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;
    if password.is_empty() {
        anyhow::bail!("password cannot be empty");
    }
    Ok(password)
}
