// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register transport
//!
//! The device facade never speaks Modbus framing itself. It talks to a
//! [`RegisterTransport`], which performs one addressed request/response
//! exchange per call against the remote board.
//!
//! ## Function codes
//!
//! | Code | Space | Access |
//! |------|-------|--------|
//! | 0x01 | Coils | read |
//! | 0x03 | Holding registers | read |
//! | 0x04 | Input registers | read |
//! | 0x05 | Coils | write single |
//! | 0x06 | Holding registers | write single |
//!
//! Implementations:
//!
//! - [`ModbusTransport`]: RTU over a serial line or TCP, built on `tokio-modbus`
//! - [`crate::simulator::LoopbackTransport`]: in-process firmware simulator

pub mod modbus;

pub use modbus::ModbusTransport;

use std::fmt;

use thiserror::Error;

/// A single 16-bit device register value.
pub type RegisterWord = u16;

/// Modbus function codes used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    ReadCoils,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
}

impl FunctionCode {
    /// Numeric code as carried on the wire
    pub fn value(self) -> u8 {
        match self {
            FunctionCode::ReadCoils => 0x01,
            FunctionCode::ReadHoldingRegisters => 0x03,
            FunctionCode::ReadInputRegisters => 0x04,
            FunctionCode::WriteSingleCoil => 0x05,
            FunctionCode::WriteSingleRegister => 0x06,
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.value())
    }
}

/// Failures of a single transport exchange.
///
/// The controller never retries; every variant is surfaced to the caller
/// as-is.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Modbus error: {0}")]
    Modbus(#[from] tokio_modbus::Error),

    #[error("Device exception: {0}")]
    Exception(#[from] tokio_modbus::ExceptionCode),

    #[error("Function code {0} cannot be used for this request")]
    UnsupportedFunction(FunctionCode),

    #[error("Invalid transport address: {0}")]
    InvalidAddress(String),
}

/// Addressed register and coil access against one device.
///
/// Every method is a blocking request/response exchange. Implementations are
/// exclusively owned by a single [`crate::device::Device`]; nothing here is
/// expected to be shared between threads.
#[cfg_attr(test, mockall::automock)]
pub trait RegisterTransport {
    /// Read `count` words starting at `address` from the register space
    /// selected by `function` (holding or input registers).
    fn read_registers(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, TransportError>;

    /// Write one holding register.
    fn write_register(&mut self, address: u16, value: RegisterWord) -> Result<(), TransportError>;

    /// Read `count` coils starting at `address`.
    fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError>;

    /// Write one coil.
    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), TransportError>;
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read_registers(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, TransportError> {
        (**self).read_registers(function, address, count)
    }

    fn write_register(&mut self, address: u16, value: RegisterWord) -> Result<(), TransportError> {
        (**self).write_register(address, value)
    }

    fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        (**self).read_coils(address, count)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), TransportError> {
        (**self).write_coil(address, value)
    }
}
