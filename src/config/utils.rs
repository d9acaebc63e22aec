// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use log::debug;

use super::{Config, TransportKind, CONFIG_SCHEMA};
use crate::device::system::MAX_SLAVE_ID;

/// Size of the Modbus register address space
const ADDRESS_SPACE: u32 = 0x1_0000;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./homectrl --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Baud rate**: an explicit baud rate must be non-zero
/// - **Slave id**: must be a unicast Modbus address (1-247)
/// - **TCP address**: must parse as `ip:port` when the TCP transport is selected
/// - **Timeout**: must be non-zero
/// - **Layout**: an explicit layout must hold every field of the firmware tables
/// - **Simulator**: the simulated register image must fit in the Modbus address space
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.transport.baud_rate == Some(0) {
        anyhow::bail!("Invalid baud rate: 0");
    }

    let slave_id = u16::from(config.transport.slave_id);
    if slave_id == 0 || slave_id > MAX_SLAVE_ID {
        anyhow::bail!("Invalid slave id: {}", slave_id);
    }

    if config.transport.kind == TransportKind::Tcp {
        config
            .transport
            .tcp_address
            .parse::<SocketAddr>()
            .with_context(|| {
                format!(
                    "Invalid TCP address '{}', expected ip:port",
                    config.transport.tcp_address
                )
            })?;
    }

    if config.transport.timeout_ms == 0 {
        anyhow::bail!("Invalid timeout: 0 ms");
    }

    let layout = config.layout();
    layout
        .validate()
        .context("Invalid register layout in device configuration")?;

    let simulator = &config.simulator;
    let simulator_id = u16::from(simulator.slave_id);
    if simulator_id == 0 || simulator_id > MAX_SLAVE_ID {
        anyhow::bail!("Invalid simulator slave id: {}", simulator_id);
    }
    if layout.holding_register_count(simulator.number_of_pins) > ADDRESS_SPACE
        || layout.input_register_count(simulator.number_of_pins) > ADDRESS_SPACE
    {
        anyhow::bail!(
            "Simulator with {} pins does not fit in the Modbus address space",
            simulator.number_of_pins
        );
    }

    if !is_valid_ip_address(&simulator.address) {
        // Hostnames are resolved by simulator::bind, so only note it
        debug!(
            "Potentially invalid simulator address format: {}",
            simulator.address
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceLayout;

    #[test]
    fn test_is_valid_ip_address() {
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("board.local"));
    }

    #[test]
    fn test_default_config_passes() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_tcp_address_checked_only_for_tcp() {
        let mut config = Config::default();
        config.transport.tcp_address = "not-an-address".to_string();
        assert!(validate_specific_rules(&config).is_ok());

        config.transport.kind = TransportKind::Tcp;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut config = Config::default();
        config.transport.baud_rate = Some(0);
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.transport.timeout_ms = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.transport.slave_id = 248;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_rejects_oversized_simulator() {
        let mut config = Config::default();
        config.simulator.number_of_pins = 5000;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_rejects_invalid_layout_override() {
        let mut config = Config::default();
        config.device.layout = Some(DeviceLayout::new(8, 16, 4, 8));
        assert!(validate_specific_rules(&config).is_err());
    }
}
