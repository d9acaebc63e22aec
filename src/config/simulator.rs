// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulator configuration
//!
//! Settings for `homectrl-simulator`, the Modbus TCP stand-in for a real
//! board.

use serde::{Deserialize, Serialize};

/// Configuration for the simulated board.
///
/// # Fields
///
/// * `address` - Address the Modbus TCP server binds to (default: 127.0.0.1)
/// * `port` - TCP port (default: 5020, so no privileges are needed)
/// * `number_of_pins` - Pins exposed by the simulated board (default: 12)
/// * `slave_id` - Initial slave id stored in the system settings (default: 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub address: String,
    pub port: u16,
    pub number_of_pins: u16,
    pub slave_id: u8,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(), // Localhost for security
            port: 5020,
            number_of_pins: 12,
            slave_id: 1,
        }
    }
}
