// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the pin board controller
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against an embedded JSON schema.
//!
//! ## Configuration Structure
//!
//! - `transport`: How the board is reached (RTU serial line or TCP)
//! - `device`: Firmware generation and optional layout override
//! - `simulator`: Settings for `homectrl-simulator`
//!
//! ## Usage
//!
//! ```no_run
//! use homectrl::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("homectrl.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/ttyUSB1".to_string()), // Serial port
//!     Some(19200),                      // Baud rate
//!     None,                             // Slave id
//!     None,                             // TCP address
//!     None,                             // Protocol version
//!     None,                             // Timeout
//! );
//!
//! println!("Serial port: {}", config.transport.serial_port);
//! ```

pub mod device;
pub mod simulator;
pub mod transport;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use device::DeviceConfig;
pub use simulator::SimulatorConfig;
pub use transport::{TransportConfig, TransportKind};
pub use utils::{is_valid_ip_address, output_config_schema};

use crate::device::{DeviceLayout, ProtocolVersion};

/// JSON schema the YAML configuration is validated against
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Link to the board.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Firmware generation and register layout of the board.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Simulated board served by `homectrl-simulator`.
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml(&contents).or_else(|err| {
            error!("Configuration error in {}: {:#}", path.display(), err);
            Self::create_sample_config(path)?;
            Err(err.context(format!("Invalid configuration in {}", path.display())))
        })
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document is a valid, all-default configuration
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|e| anyhow::anyhow!("Invalid configuration schema: {}", e))?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = serde_yml::from_str(contents)
            .context("Failed to deserialize configuration")?;

        utils::validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the configuration.
    /// Giving a TCP address switches the transport to TCP.
    ///
    /// # Parameters
    ///
    /// * `serial_port` - Serial device for RTU mode
    /// * `baud_rate` - Line speed
    /// * `slave_id` - Modbus slave address of the board
    /// * `tcp_address` - `host:port` of a Modbus TCP endpoint
    /// * `protocol` - Firmware generation
    /// * `timeout_ms` - Request timeout in milliseconds
    pub fn apply_args(
        &mut self,
        serial_port: Option<String>,
        baud_rate: Option<u32>,
        slave_id: Option<u8>,
        tcp_address: Option<String>,
        protocol: Option<ProtocolVersion>,
        timeout_ms: Option<u64>,
    ) {
        if let Some(port) = serial_port {
            debug!("Overriding serial port from command line: {}", port);
            self.transport.serial_port = port;
            self.transport.kind = TransportKind::Rtu;
        }
        if let Some(baud) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud);
            self.transport.baud_rate = Some(baud);
        }
        if let Some(id) = slave_id {
            debug!("Overriding slave id from command line: {}", id);
            self.transport.slave_id = id;
        }
        if let Some(address) = tcp_address {
            debug!("Overriding TCP address from command line: {}", address);
            self.transport.tcp_address = address;
            self.transport.kind = TransportKind::Tcp;
        }
        if let Some(version) = protocol {
            debug!("Overriding protocol version from command line: {}", version);
            self.device.protocol = version;
        }
        if let Some(timeout) = timeout_ms {
            debug!("Overriding timeout from command line: {} ms", timeout);
            self.transport.timeout_ms = timeout;
        }
    }

    /// Register layout in effect
    pub fn layout(&self) -> DeviceLayout {
        self.device.layout()
    }

    /// Baud rate in effect: explicit value or the protocol default
    pub fn effective_baud_rate(&self) -> u32 {
        self.transport
            .baud_rate
            .unwrap_or_else(|| self.device.protocol.default_baud_rate())
    }
}
