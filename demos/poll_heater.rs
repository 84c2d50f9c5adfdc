// SPDX-License-Identifier: MPL-2.0

//! Test program: poll a heater and print every snapshot.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example poll_heater -- <host> [seconds] [username password]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=kospel_lib=debug cargo run --example poll_heater -- 192.168.1.50 120
//! ```

use std::env;
use std::time::Duration;

use kospel_lib::protocol::ConnectionConfig;
use kospel_lib::{Coordinator, CoordinatorConfig, Subscribable};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <host> [seconds] [username password]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example poll_heater -- 192.168.1.50 120");
        std::process::exit(1);
    }

    let host = &args[1];
    let seconds: u64 = args.get(2).map_or(Ok(60), |s| s.parse())?;

    let mut connection = ConnectionConfig::new(host.as_str());
    if let (Some(username), Some(password)) = (args.get(3), args.get(4)) {
        connection = connection.with_credentials(username.as_str(), password.as_str());
    }

    let config = CoordinatorConfig::default().with_poll_interval(Duration::from_secs(10));
    let coordinator = Coordinator::http(&connection, config)?;

    println!("Connecting to {host}...");
    let device = coordinator.test_connection().await?;
    println!("Found device {device}");

    coordinator.on_state_changed(|state| println!("State: {state}"));
    coordinator.on_field_changed(|field, value| match value {
        Some(value) => println!("  {field} = {value}"),
        None => println!("  {field} no longer reported"),
    });

    let poller = coordinator.spawn();

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => println!("Interrupted"),
    }

    if let Some(snapshot) = coordinator.current_snapshot() {
        println!("Last snapshot at {}:", snapshot.timestamp());
        for (field, value) in snapshot.iter() {
            println!("  {field}: {value}");
        }
    }

    poller.shutdown().await;
    println!("Done!");
    Ok(())
}
