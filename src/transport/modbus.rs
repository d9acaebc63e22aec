// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus transport built on the blocking `tokio-modbus` client
//!
//! The board sits on an RS-485 line and answers Modbus RTU. A TCP variant is
//! provided for serial gateways and for the bundled simulator.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio_modbus::prelude::*;
use tokio_serial::{DataBits, Parity, StopBits};

use super::{FunctionCode, RegisterTransport, RegisterWord, TransportError};
use crate::config::{Config, TransportKind};

/// Modbus client bound to a single slave.
pub struct ModbusTransport {
    ctx: sync::Context,
    description: String,
}

impl ModbusTransport {
    /// Open the transport described by the configuration.
    ///
    /// The baud rate falls back to the default of the configured protocol
    /// version when the transport section does not pin one.
    pub fn open(config: &Config) -> Result<Self, TransportError> {
        let transport = &config.transport;
        let timeout = Duration::from_millis(transport.timeout_ms);
        match transport.kind {
            TransportKind::Rtu => Self::rtu(
                &transport.serial_port,
                config.effective_baud_rate(),
                transport.slave_id,
                timeout,
            ),
            TransportKind::Tcp => Self::tcp(&transport.tcp_address, transport.slave_id, timeout),
        }
    }

    /// Connect to a slave over a serial line (8N1).
    pub fn rtu(
        path: &str,
        baud_rate: u32,
        slave_id: u8,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        debug!(
            "Opening Modbus RTU on {} at {} baud, slave {}",
            path, baud_rate, slave_id
        );
        let builder = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout);
        let ctx = sync::rtu::connect_slave_with_timeout(&builder, Slave(slave_id), Some(timeout))?;
        Ok(Self {
            ctx,
            description: format!("rtu:{}@{}", path, baud_rate),
        })
    }

    /// Connect to a slave over Modbus TCP.
    pub fn tcp(address: &str, slave_id: u8, timeout: Duration) -> Result<Self, TransportError> {
        let socket_addr: SocketAddr = address
            .parse()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", address, e)))?;
        debug!("Opening Modbus TCP to {}, slave {}", socket_addr, slave_id);
        let ctx =
            sync::tcp::connect_slave_with_timeout(socket_addr, Slave(slave_id), Some(timeout))?;
        Ok(Self {
            ctx,
            description: format!("tcp:{}", socket_addr),
        })
    }

    /// Human readable endpoint, used in log lines
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl RegisterTransport for ModbusTransport {
    fn read_registers(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, TransportError> {
        debug!(
            "{} fc={} read {} registers at {}",
            self.description, function, count, address
        );
        let words = match function {
            FunctionCode::ReadHoldingRegisters => self.ctx.read_holding_registers(address, count)??,
            FunctionCode::ReadInputRegisters => self.ctx.read_input_registers(address, count)??,
            other => return Err(TransportError::UnsupportedFunction(other)),
        };
        debug!("{} <- {:?}", self.description, words);
        Ok(words)
    }

    fn write_register(&mut self, address: u16, value: RegisterWord) -> Result<(), TransportError> {
        debug!(
            "{} fc={} write {:#x} to register {}",
            self.description,
            FunctionCode::WriteSingleRegister,
            value,
            address
        );
        self.ctx.write_single_register(address, value)??;
        Ok(())
    }

    fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        debug!(
            "{} fc={} read {} coils at {}",
            self.description,
            FunctionCode::ReadCoils,
            count,
            address
        );
        let coils = self.ctx.read_coils(address, count)??;
        debug!("{} <- {:?}", self.description, coils);
        Ok(coils)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), TransportError> {
        debug!(
            "{} fc={} write {} to coil {}",
            self.description,
            FunctionCode::WriteSingleCoil,
            value,
            address
        );
        self.ctx.write_single_coil(address, value)??;
        Ok(())
    }
}
