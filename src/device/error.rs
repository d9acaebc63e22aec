// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the device model and the facade.
///
/// Validation variants (`InvalidPinIndex`, `UnknownField`, `UnknownCommand`,
/// `InvalidValue`, `NotConnected`) are raised before any request reaches the transport.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Pin index {index} out of range (device has {number_of_pins} pins)")]
    InvalidPinIndex { index: i64, number_of_pins: u16 },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Device is not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol violation: expected {expected} values, device returned {actual}")]
    ProtocolViolation { expected: usize, actual: usize },

    #[error("Invalid value {value} for {field}")]
    InvalidValue { field: String, value: i64 },

    #[error("Invalid device layout: {0}")]
    InvalidLayout(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
