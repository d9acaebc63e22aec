// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pin board device model
//!
//! This module ties the register layout to a transport and provides the
//! whole-device operations of the controller.
//!
//! ## Key Components
//!
//! - [`DeviceLayout`]: address arithmetic for settings and counter blocks
//! - [`PinSettings`]: read/write access to one pin's settings block
//! - [`PinCounters`]: read access to one pin's button counters
//! - [`Device`]: pin discovery, uptime, coils and bulk dumps
//!
//! ## Lifecycle
//!
//! A [`Device`] starts `Disconnected`. [`Device::connect`] reads the number of
//! pins from input register 0 and moves it to `Connected`; every other
//! operation fails with [`DeviceError::NotConnected`] before that. A failed
//! exchange while connected does not change the state, and nothing is
//! retried.
//!
//! ## Usage
//!
//! ```no_run
//! use homectrl::config::Config;
//! use homectrl::device::Device;
//!
//! let config = Config::default();
//! let mut device = Device::open(&config).unwrap();
//! for (pin, settings) in device.dump_holding_registers().unwrap() {
//!     println!("pin {}: {:?}", pin, settings);
//! }
//! ```

pub mod error;
pub mod layout;
pub mod pin_counters;
pub mod pin_settings;
pub mod semantics;
pub mod system;

pub use error::{DeviceError, DeviceResult};
pub use layout::{
    DeviceLayout, FieldValues, PinCounterField, PinSettingField, ProtocolVersion, RegisterField,
    SystemSettingField,
};
pub use pin_counters::PinCounters;
pub use pin_settings::PinSettings;
pub use semantics::{Command, PinDirection, PinMode};

use log::{debug, info};

use crate::config::Config;
use crate::transport::{FunctionCode, ModbusTransport, RegisterTransport, RegisterWord};

/// Connection state of a [`Device`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { number_of_pins: u16 },
}

/// Result of [`Device::dump_input_registers`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRegisterDump {
    /// The system input block, `system_setting_size` words from address 0
    pub system: Vec<RegisterWord>,
    /// Counters of every pin, in pin order
    pub pins: Vec<(u16, FieldValues<PinCounterField>)>,
}

/// A pin board reached through an exclusively owned transport.
///
/// Operations are blocking and strictly sequential; wrap the device in a
/// mutex if it has to be shared.
pub struct Device<T: RegisterTransport> {
    transport: T,
    layout: DeviceLayout,
    state: ConnectionState,
}

impl Device<ModbusTransport> {
    /// Open the configured transport and discover the board.
    pub fn open(config: &Config) -> DeviceResult<Self> {
        let layout = config.layout();
        let transport = ModbusTransport::open(config)?;
        info!("Connecting to {} ({})", transport.description(), config.device.protocol);
        let mut device = Device::new(transport, layout)?;
        device.connect()?;
        Ok(device)
    }
}

impl<T: RegisterTransport> Device<T> {
    /// Wrap a transport. No request is sent until [`Device::connect`].
    pub fn new(transport: T, layout: DeviceLayout) -> DeviceResult<Self> {
        layout.validate()?;
        Ok(Self {
            transport,
            layout,
            state: ConnectionState::Disconnected,
        })
    }

    /// Read the pin count register and enter the `Connected` state.
    ///
    /// Zero pins is accepted; the board is then simply empty.
    pub fn connect(&mut self) -> DeviceResult<u16> {
        let words = self.transport.read_registers(
            FunctionCode::ReadInputRegisters,
            layout::NUMBER_OF_PINS_ADDRESS,
            1,
        )?;
        let number_of_pins = *words.first().ok_or(DeviceError::ProtocolViolation {
            expected: 1,
            actual: 0,
        })?;
        info!("Device reports {} pins", number_of_pins);
        self.state = ConnectionState::Connected { number_of_pins };
        Ok(number_of_pins)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    /// Number of pins discovered by [`Device::connect`]
    pub fn number_of_pins(&self) -> DeviceResult<u16> {
        match self.state {
            ConnectionState::Connected { number_of_pins } => Ok(number_of_pins),
            ConnectionState::Disconnected => Err(DeviceError::NotConnected),
        }
    }

    /// Give the transport back, e.g. to inspect a test double.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Uptime counter of the board in milliseconds.
    pub fn uptime_millis(&mut self) -> DeviceResult<u32> {
        self.number_of_pins()?;
        let words = self.transport.read_registers(
            FunctionCode::ReadInputRegisters,
            layout::UPTIME_ADDRESS,
            2,
        )?;
        system::decode_u32_word_swapped(&words)
    }

    pub fn uptime_seconds(&mut self) -> DeviceResult<f64> {
        Ok(self.uptime_millis()? as f64 / 1000.0)
    }

    /// State of every coil, one entry per pin in ascending order.
    pub fn dump_coils(&mut self) -> DeviceResult<Vec<(u16, bool)>> {
        let number_of_pins = self.number_of_pins()?;
        if number_of_pins == 0 {
            return Ok(Vec::new());
        }
        let coils = self.transport.read_coils(0, number_of_pins)?;
        if coils.len() < number_of_pins as usize {
            return Err(DeviceError::ProtocolViolation {
                expected: number_of_pins as usize,
                actual: coils.len(),
            });
        }
        Ok((0..number_of_pins).zip(coils).collect())
    }

    pub fn set_coil(&mut self, pin: u16, value: bool) -> DeviceResult<()> {
        let number_of_pins = self.number_of_pins()?;
        layout::check_pin_index(pin, number_of_pins)?;
        debug!("Setting coil {} to {}", pin, value);
        self.transport.write_coil(pin, value)?;
        Ok(())
    }

    /// Settings accessor for one pin. This is the only way to obtain a
    /// [`PinSettings`], so the index is always checked.
    pub fn pin_settings(&mut self, pin: u16) -> DeviceResult<PinSettings<'_, T>> {
        let number_of_pins = self.number_of_pins()?;
        PinSettings::new(&mut self.transport, &self.layout, pin, number_of_pins)
    }

    /// Counters accessor for one pin.
    pub fn pin_counters(&mut self, pin: u16) -> DeviceResult<PinCounters<'_, T>> {
        let number_of_pins = self.number_of_pins()?;
        PinCounters::new(&mut self.transport, &self.layout, pin, number_of_pins)
    }

    /// Settings of every pin, in pin order. The first failing read aborts the
    /// dump.
    pub fn dump_holding_registers(
        &mut self,
    ) -> DeviceResult<Vec<(u16, FieldValues<PinSettingField>)>> {
        let number_of_pins = self.number_of_pins()?;
        let mut dump = Vec::with_capacity(number_of_pins as usize);
        for pin in 0..number_of_pins {
            let values = self.pin_settings(pin)?.read_all()?;
            dump.push((pin, values));
        }
        Ok(dump)
    }

    /// System input block followed by the counters of every pin. The first
    /// failing read aborts the dump.
    pub fn dump_input_registers(&mut self) -> DeviceResult<InputRegisterDump> {
        let number_of_pins = self.number_of_pins()?;
        let size = self.layout.system_setting_size;
        let system = self
            .transport
            .read_registers(FunctionCode::ReadInputRegisters, 0, size)?;
        if system.len() < size as usize {
            return Err(DeviceError::ProtocolViolation {
                expected: size as usize,
                actual: system.len(),
            });
        }
        let mut pins = Vec::with_capacity(number_of_pins as usize);
        for pin in 0..number_of_pins {
            let values = self.pin_counters(pin)?.read_all()?;
            pins.push((pin, values));
        }
        Ok(InputRegisterDump {
            system: system[..size as usize].to_vec(),
            pins,
        })
    }

    pub fn system_settings(&mut self) -> DeviceResult<FieldValues<SystemSettingField>> {
        self.number_of_pins()?;
        system::read_system_settings(&mut self.transport, &self.layout)
    }

    pub fn set_slave_id(&mut self, slave_id: u16) -> DeviceResult<()> {
        self.number_of_pins()?;
        system::write_slave_id(&mut self.transport, slave_id)
    }
}
