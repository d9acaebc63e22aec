// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register image of a simulated pin board
//!
//! [`DeviceImage`] holds the coils, holding registers and input registers of
//! one board and applies the firmware's rules to every request:
//!
//! - holding register 0 (magic) and the reserved system words are not writable
//! - holding register values are bytes, anything above `0xFF` is rejected
//! - `mode` must select input, output or input-pullup
//! - command fields accept `none` up to `pwm_decrease`
//! - a coil write only changes pins configured as outputs
//! - every access beyond the image is an illegal data address
//!
//! Input registers 1 and 2 carry the uptime in milliseconds, low word first.

use std::time::{Duration, Instant};

use log::debug;
use tokio_modbus::ExceptionCode;

use crate::device::layout::{MAGIC, NUMBER_OF_PINS_ADDRESS, UPTIME_ADDRESS};
use crate::device::{
    Command, DeviceError, DeviceLayout, DeviceResult, PinCounterField, PinMode, PinSettingField,
    RegisterField, SystemSettingField,
};
use crate::transport::RegisterWord;

/// Arduino pin number of the first pin
const FIRST_PIN_NUMBER: u16 = 2;

/// Event counters, in the order of [`PinCounterField`] after `pin_number`
const EVENT_COUNTERS: usize = 5;

#[derive(Debug, Clone)]
struct PinImage {
    pin_number: u16,
    settings: Vec<RegisterWord>,
    counters: [RegisterWord; EVENT_COUNTERS],
    current_value: RegisterWord,
}

impl PinImage {
    fn setting(&self, field: PinSettingField) -> RegisterWord {
        self.settings[field.offset() as usize]
    }

    fn mode(&self) -> Option<PinMode> {
        PinMode::decode(self.setting(PinSettingField::Mode))
    }

    fn is_output(&self) -> bool {
        self.mode().is_some_and(|mode| mode.is_output())
    }

    fn has_pwm(&self) -> bool {
        self.mode().is_some_and(|mode| mode.pwm)
    }
}

/// Register image of a simulated board
#[derive(Debug, Clone)]
pub struct DeviceImage {
    layout: DeviceLayout,
    system: Vec<RegisterWord>,
    pins: Vec<PinImage>,
    started: Instant,
    uptime_offset: Duration,
}

impl DeviceImage {
    /// Create a factory-fresh board: every pin is an input without button,
    /// all counters are zero.
    pub fn new(layout: DeviceLayout, number_of_pins: u16, slave_id: u8) -> DeviceResult<Self> {
        layout.validate()?;
        if layout.holding_register_count(number_of_pins) > 0x1_0000
            || layout.input_register_count(number_of_pins) > 0x1_0000
        {
            return Err(DeviceError::InvalidValue {
                field: "number_of_pins".to_string(),
                value: number_of_pins as i64,
            });
        }

        let mut system = vec![0; layout.system_setting_size as usize];
        system[SystemSettingField::Magic.offset() as usize] = MAGIC;
        system[SystemSettingField::SlaveId.offset() as usize] = slave_id as RegisterWord;

        let pins = (0..number_of_pins)
            .map(|index| PinImage {
                pin_number: FIRST_PIN_NUMBER.wrapping_add(index),
                settings: vec![0; layout.pin_setting_size as usize],
                counters: [0; EVENT_COUNTERS],
                current_value: 0,
            })
            .collect();

        Ok(Self {
            layout,
            system,
            pins,
            started: Instant::now(),
            uptime_offset: Duration::ZERO,
        })
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    pub fn number_of_pins(&self) -> u16 {
        self.pins.len() as u16
    }

    /// Slave id currently stored in the system settings
    pub fn slave_id(&self) -> RegisterWord {
        self.system[SystemSettingField::SlaveId.offset() as usize]
    }

    /// Milliseconds since power-up, wrapping like the firmware's clock
    pub fn uptime_millis(&self) -> u32 {
        (self.started.elapsed() + self.uptime_offset).as_millis() as u32
    }

    /// Move the uptime clock forward.
    pub fn advance_uptime(&mut self, by: Duration) {
        self.uptime_offset += by;
    }

    pub fn read_coils(&self, address: u16, count: u16) -> Result<Vec<bool>, ExceptionCode> {
        let range = checked_range(address, count, self.pins.len())?;
        Ok(self.pins[range]
            .iter()
            .map(|pin| pin.current_value != 0)
            .collect())
    }

    pub fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ExceptionCode> {
        if address as usize >= self.pins.len() {
            debug!("SIMULATOR: coil {} out of range", address);
            return Err(ExceptionCode::IllegalDataAddress);
        }
        self.update_output(address as usize, value as RegisterWord);
        Ok(())
    }

    pub fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, ExceptionCode> {
        let end = self.layout.holding_register_count(self.number_of_pins()) as usize;
        let range = checked_range(address, count, end)?;
        Ok(range.map(|addr| self.holding_register(addr)).collect())
    }

    pub fn write_holding_register(
        &mut self,
        address: u16,
        value: RegisterWord,
    ) -> Result<(), ExceptionCode> {
        let end = self.layout.holding_register_count(self.number_of_pins());
        if address as u32 >= end {
            return Err(ExceptionCode::IllegalDataAddress);
        }
        if value > 0xFF {
            return Err(ExceptionCode::IllegalDataValue);
        }

        let system_size = self.layout.system_setting_size;
        if address < system_size {
            if address != SystemSettingField::SlaveId.offset() {
                debug!("SIMULATOR: system register {} is read-only", address);
                return Err(ExceptionCode::IllegalDataAddress);
            }
            self.system[address as usize] = value;
            return Ok(());
        }

        let relative = address - system_size;
        let pin = (relative / self.layout.pin_setting_size) as usize;
        let offset = relative % self.layout.pin_setting_size;

        if let Some(field) = PinSettingField::ALL.get(offset as usize).copied() {
            validate_setting(field, value)?;
        }
        self.pins[pin].settings[offset as usize] = value;
        Ok(())
    }

    pub fn read_input_registers(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<RegisterWord>, ExceptionCode> {
        let end = self.layout.input_register_count(self.number_of_pins()) as usize;
        let range = checked_range(address, count, end)?;
        let uptime = self.uptime_millis();
        Ok(range.map(|addr| self.input_register(addr, uptime)).collect())
    }

    /// Register a button event on `pin`: bump its counter and run the
    /// configured command on the outputs of the pin's group.
    pub fn record_event(&mut self, pin: u16, event: PinCounterField) -> DeviceResult<()> {
        crate::device::layout::check_pin_index(pin, self.number_of_pins())?;
        let command_field = match event {
            PinCounterField::PinNumber => {
                return Err(DeviceError::UnknownField(event.name().to_string()))
            }
            PinCounterField::ClickCnt => PinSettingField::ClickCommand,
            PinCounterField::SingleClickCnt => PinSettingField::SingleClickCommand,
            PinCounterField::DoubleClickCnt => PinSettingField::DoubleClickCommand,
            PinCounterField::LongPressCnt => PinSettingField::LongClickCommand,
            PinCounterField::ReleaseCnt => PinSettingField::ReleaseCommand,
        };

        let source = &mut self.pins[pin as usize];
        let counter = &mut source.counters[event.offset() as usize - 1];
        *counter = counter.wrapping_add(1);

        let group = source.setting(PinSettingField::Group);
        let command = Command::from_code(source.setting(command_field));
        debug!(
            "SIMULATOR: pin {} {} -> {:?} on group {}",
            pin, event, command, group
        );
        if let Some(command) = command {
            self.trigger_command(group, command);
        }
        Ok(())
    }

    /// Register a level change on a plain input: run its rise or fall
    /// command on the outputs of the pin's group. Buttons and outputs do not
    /// react to signals and no counter is touched.
    pub fn record_signal(&mut self, pin: u16, rising: bool) -> DeviceResult<()> {
        crate::device::layout::check_pin_index(pin, self.number_of_pins())?;
        let source = &self.pins[pin as usize];
        let Some(mode) = source.mode() else {
            return Ok(());
        };
        if mode.button || mode.is_output() {
            debug!("SIMULATOR: pin {} does not take signals, ignoring", pin);
            return Ok(());
        }

        let command_field = if rising {
            PinSettingField::SignalRiseCommand
        } else {
            PinSettingField::SignalFallCommand
        };
        let group = source.setting(PinSettingField::Group);
        let command = Command::from_code(source.setting(command_field));
        debug!(
            "SIMULATOR: pin {} {} -> {:?} on group {}",
            pin, command_field, command, group
        );
        if let Some(command) = command {
            self.trigger_command(group, command);
        }
        Ok(())
    }

    fn trigger_command(&mut self, group: RegisterWord, command: Command) {
        if group == 0 {
            return;
        }
        for index in 0..self.pins.len() {
            let pin = &self.pins[index];
            if pin.setting(PinSettingField::Group) != group || !pin.is_output() {
                continue;
            }
            let pwm = pin.has_pwm();
            let on_value = if pwm { 0xFF } else { 0x01 };
            let current = pin.current_value;
            let next = match command {
                Command::On => Some(on_value),
                Command::Off => Some(0),
                Command::Toggle => Some(if current > 0 { 0 } else { on_value }),
                Command::PwmIncrease if pwm && current < 0xFF => Some(current + 1),
                Command::PwmDecrease if pwm && current > 0 => Some(current - 1),
                _ => None,
            };
            if let Some(value) = next {
                self.update_output(index, value);
            }
        }
    }

    fn update_output(&mut self, index: usize, value: RegisterWord) {
        let pin = &mut self.pins[index];
        if !pin.is_output() {
            debug!("SIMULATOR: pin {} is not an output, ignoring", index);
            return;
        }
        pin.current_value = value;
        pin.settings[PinSettingField::OutputValue.offset() as usize] = value;
    }

    fn holding_register(&self, address: usize) -> RegisterWord {
        let system_size = self.layout.system_setting_size as usize;
        if address < system_size {
            return self.system[address];
        }
        let relative = address - system_size;
        let block = self.layout.pin_setting_size as usize;
        self.pins[relative / block].settings[relative % block]
    }

    fn input_register(&self, address: usize, uptime: u32) -> RegisterWord {
        let counter_offset = self.layout.pin_counter_offset as usize;
        if address < counter_offset {
            return match address {
                a if a == NUMBER_OF_PINS_ADDRESS as usize => self.number_of_pins(),
                a if a == UPTIME_ADDRESS as usize => uptime as RegisterWord,
                a if a == UPTIME_ADDRESS as usize + 1 => (uptime >> 16) as RegisterWord,
                _ => 0,
            };
        }
        let relative = address - counter_offset;
        let block = self.layout.pin_counter_size as usize;
        let pin = &self.pins[relative / block];
        match relative % block {
            0 => pin.pin_number,
            offset if offset <= EVENT_COUNTERS => pin.counters[offset - 1],
            _ => 0,
        }
    }
}

fn validate_setting(field: PinSettingField, value: RegisterWord) -> Result<(), ExceptionCode> {
    if field == PinSettingField::Mode && PinMode::decode(value).is_none() {
        debug!("SIMULATOR: invalid mode {:#x}", value);
        return Err(ExceptionCode::IllegalDataValue);
    }
    if field.is_command() && value > Command::MAX_ACCEPTED.code() {
        debug!("SIMULATOR: command {:#x} not accepted for {}", value, field);
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

fn checked_range(
    address: u16,
    count: u16,
    end: usize,
) -> Result<std::ops::Range<usize>, ExceptionCode> {
    let start = address as usize;
    let stop = start + count as usize;
    if stop > end {
        debug!(
            "SIMULATOR: range {}..{} beyond image of {} entries",
            start, stop, end
        );
        return Err(ExceptionCode::IllegalDataAddress);
    }
    Ok(start..stop)
}
