// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device-wide registers: system settings block and uptime counter

use log::debug;

use super::error::{DeviceError, DeviceResult};
use super::layout::{DeviceLayout, FieldValues, RegisterField, SystemSettingField};
use crate::transport::{FunctionCode, RegisterTransport, RegisterWord};

/// Highest unicast Modbus slave address
pub const MAX_SLAVE_ID: u16 = 247;

/// Read the system settings block (holding registers starting at 0).
pub fn read_system_settings<T: RegisterTransport + ?Sized>(
    transport: &mut T,
    layout: &DeviceLayout,
) -> DeviceResult<FieldValues<SystemSettingField>> {
    let words = transport.read_registers(
        FunctionCode::ReadHoldingRegisters,
        0,
        layout.system_setting_size,
    )?;
    FieldValues::from_block(&words, layout.system_setting_size)
}

/// Change the slave id the board answers to.
///
/// The new id only takes effect on the wire after the board restarts.
pub fn write_slave_id<T: RegisterTransport + ?Sized>(
    transport: &mut T,
    slave_id: u16,
) -> DeviceResult<()> {
    if !(1..=MAX_SLAVE_ID).contains(&slave_id) {
        return Err(DeviceError::InvalidValue {
            field: SystemSettingField::SlaveId.name().to_string(),
            value: slave_id as i64,
        });
    }
    debug!("Setting slave id to {}", slave_id);
    transport.write_register(SystemSettingField::SlaveId.offset(), slave_id)?;
    Ok(())
}

/// Combine two registers holding a 32-bit value, low word first.
pub fn decode_u32_word_swapped(words: &[RegisterWord]) -> DeviceResult<u32> {
    match words {
        [low, high, ..] => Ok(((*high as u32) << 16) | *low as u32),
        _ => Err(DeviceError::ProtocolViolation {
            expected: 2,
            actual: words.len(),
        }),
    }
}
