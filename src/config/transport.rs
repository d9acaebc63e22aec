// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transport configuration
//!
//! This module defines how the controller reaches the board: Modbus RTU on a
//! serial line, or Modbus TCP through a gateway or the simulator.

use serde::{Deserialize, Serialize};

/// Link used to reach the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Modbus RTU over a serial line (RS-485 adapter)
    #[default]
    Rtu,
    /// Modbus TCP, e.g. a serial gateway or `homectrl-simulator`
    Tcp,
}

/// Configuration for the register transport.
///
/// # Fields
///
/// * `kind` - `rtu` or `tcp`
/// * `serial_port` - Serial device used in RTU mode (default: /dev/ttyUSB0)
/// * `baud_rate` - Line speed; when absent the protocol version decides
/// * `slave_id` - Modbus slave address of the board (default: 1)
/// * `tcp_address` - `host:port` used in TCP mode (default: 127.0.0.1:5020)
/// * `timeout_ms` - Request timeout in milliseconds (default: 1000)
///
/// # Example
///
/// ```
/// use homectrl::config::{TransportConfig, TransportKind};
///
/// let transport = TransportConfig {
///     kind: TransportKind::Rtu,
///     serial_port: "/dev/ttyUSB1".to_string(),
///     baud_rate: Some(19200),
///     ..TransportConfig::default()
/// };
/// assert_eq!(transport.slave_id, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    /// Explicit line speed. Leave unset to use the default of the configured
    /// protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,

    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    #[serde(default = "default_tcp_address")]
    pub tcp_address: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_slave_id() -> u8 {
    1
}

fn default_tcp_address() -> String {
    "127.0.0.1:5020".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            serial_port: default_serial_port(),
            baud_rate: None,
            slave_id: default_slave_id(),
            tcp_address: default_tcp_address(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
