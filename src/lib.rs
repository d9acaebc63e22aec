// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Home automation pin board controller
//!
//! This library talks to a microcontroller pin board over Modbus. The board
//! exposes per-pin settings as holding registers, button counters as input
//! registers and output states as coils; [`device::Device`] maps that address
//! space to typed operations.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration, schema validation, command line overrides
//! - [`device`]: register layout, pin accessors and the device facade
//! - [`transport`]: the register transport trait and its Modbus implementation
//! - [`simulator`]: a software board for tests and for `homectrl-simulator`
//! - [`report`]: text rendering of dumps
//!
//! The library only emits `log` records; installing a logger is left to the
//! binaries.

pub mod config;
pub mod device;
pub mod report;
pub mod simulator;
pub mod transport;
