// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Simulated pin board served over Modbus TCP
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tokio::signal;

use homectrl::config::Config;
use homectrl::device::ProtocolVersion;
use homectrl::simulator::{self, DeviceImage, HomectrlModbusServer};

/// Modbus TCP simulator of the home automation pin board
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    address: Option<String>,

    /// TCP port to listen on
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Number of pins of the simulated board
    #[arg(long)]
    number_of_pins: Option<u16>,

    /// Firmware generation to simulate
    #[arg(long, value_enum)]
    protocol: Option<ProtocolVersion>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("homectrl.yaml"));
    let mut config = Config::from_file(&config_path)?;
    config.apply_args(None, None, None, None, args.protocol, None);

    let mut simulator_config = config.simulator.clone();
    if let Some(address) = args.address {
        simulator_config.address = address;
    }
    if let Some(port) = args.port {
        simulator_config.port = port;
    }
    if let Some(number_of_pins) = args.number_of_pins {
        simulator_config.number_of_pins = number_of_pins;
    }

    let image = DeviceImage::new(
        config.layout(),
        simulator_config.number_of_pins,
        simulator_config.slave_id,
    )
    .context("Failed to build the simulated board")?;

    info!(
        "Simulating a {} board with {} pins, slave id {}",
        config.device.protocol, simulator_config.number_of_pins, simulator_config.slave_id
    );

    let listener = simulator::bind(&simulator_config.address, simulator_config.port).await?;

    let server = HomectrlModbusServer::new(image);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = simulator::serve(listener, server).await {
            error!("Modbus server error: {:#}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, stopping simulator"),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }

    server_handle.abort();
    match tokio::time::timeout(Duration::from_secs(5), server_handle).await {
        Ok(_) => info!("Modbus server shut down successfully"),
        Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
    }

    Ok(())
}
