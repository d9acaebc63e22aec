// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated pin board
//!
//! A software stand-in for the firmware, used by `homectrl-simulator` and by
//! the tests.
//!
//! - [`DeviceImage`]: registers of one board and the firmware's write rules
//! - [`HomectrlModbusServer`]: the image served over Modbus TCP
//! - [`LoopbackTransport`]: the image as an in-process [`RegisterTransport`]

pub mod image;
pub mod modbus_server;

pub use image::DeviceImage;
pub use modbus_server::{bind, serve, HomectrlModbusServer, SharedImage};

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio_modbus::ExceptionCode;

use crate::transport::{FunctionCode, RegisterTransport, RegisterWord, TransportError};

/// In-process transport talking straight to a [`DeviceImage`].
///
/// Device exceptions surface as [`TransportError::Exception`], exactly as they
/// would through a real Modbus link.
#[derive(Clone)]
pub struct LoopbackTransport {
    image: SharedImage,
}

impl LoopbackTransport {
    pub fn new(image: DeviceImage) -> Self {
        Self {
            image: Arc::new(Mutex::new(image)),
        }
    }

    /// Share an image with a server or a test
    pub fn with_image(image: SharedImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> SharedImage {
        Arc::clone(&self.image)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceImage>, TransportError> {
        self.image
            .lock()
            .map_err(|_| TransportError::Exception(ExceptionCode::ServerDeviceFailure))
    }
}

impl RegisterTransport for LoopbackTransport {
    fn read_registers(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, TransportError> {
        debug!("loopback fc={} read {} registers at {}", function, count, address);
        let image = self.lock()?;
        let words = match function {
            FunctionCode::ReadHoldingRegisters => image.read_holding_registers(address, count)?,
            FunctionCode::ReadInputRegisters => image.read_input_registers(address, count)?,
            other => return Err(TransportError::UnsupportedFunction(other)),
        };
        Ok(words)
    }

    fn write_register(&mut self, address: u16, value: RegisterWord) -> Result<(), TransportError> {
        debug!("loopback write {:#x} to register {}", value, address);
        self.lock()?.write_holding_register(address, value)?;
        Ok(())
    }

    fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        debug!("loopback read {} coils at {}", count, address);
        Ok(self.lock()?.read_coils(address, count)?)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), TransportError> {
        debug!("loopback write {} to coil {}", value, address);
        self.lock()?.write_coil(address, value)?;
        Ok(())
    }
}
