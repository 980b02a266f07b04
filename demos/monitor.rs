// SPDX-License-Identifier: MPL-2.0

//! Test program: monitor an SDCP printer.
//!
//! Without an address the program scans the local network first and
//! monitors the first printer that answers.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- [address]
//! ```
//!
//! # Example
//!
//! ```bash
//! cargo run --example monitor -- 192.168.1.40
//! RUST_LOG=sdcp_lib=debug cargo run --example monitor -- ws://192.168.1.40:3030/websocket
//! ```

use std::env;

use sdcp_lib::discovery::{self, DiscoveryOptions};
use sdcp_lib::{Printer, PrinterEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let address = match env::args().nth(1) {
        Some(address) => address,
        None => {
            println!("Scanning for printers...");
            let found = discovery::discover(DiscoveryOptions::new()).await?;
            for printer in &found {
                println!(
                    "  {} {} ({})",
                    printer.address,
                    printer.name.as_deref().unwrap_or("?"),
                    printer.machine_name.as_deref().unwrap_or("unknown model"),
                );
            }
            let Some(first) = found.first() else {
                eprintln!("No printer answered");
                std::process::exit(1);
            };
            first.address.to_string()
        }
    };

    println!("Connecting to {address}...");
    let printer = Printer::connect(&address)?;
    let mut events = printer.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Ok(event) = event else { break };
                match event {
                    PrinterEvent::ConnectionChanged { connected: true, .. } => {
                        println!("Connected");
                        printer.request_attributes().await?;
                    }
                    PrinterEvent::ConnectionChanged { connected: false, error } => {
                        println!("Disconnected: {}", error.as_deref().unwrap_or("closed"));
                    }
                    PrinterEvent::StateChanged { updates, .. } => {
                        for update in updates {
                            println!("  {} = {}", update.path, update.value);
                        }
                    }
                    PrinterEvent::CommandCompleted { opcode, outcome, .. } => {
                        println!("Command {opcode:?}: {outcome:?}");
                    }
                    PrinterEvent::AttributesReceived(attributes) => {
                        println!(
                            "Printer: {} ({}), firmware {}",
                            attributes.name.as_deref().unwrap_or("?"),
                            attributes.machine_name.as_deref().unwrap_or("?"),
                            attributes.firmware_version.as_deref().unwrap_or("?"),
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    printer.shutdown().await;
    Ok(())
}
