// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Text rendering of device dumps
//!
//! One line per value, hexadecimal for register words. With `decode` set,
//! modes, commands and the magic word are followed by their meaning in
//! parentheses.

use std::io::{self, Write};

use crate::device::layout::MAGIC;
use crate::device::{
    Command, FieldValues, InputRegisterDump, PinMode, PinSettingField, SystemSettingField,
};
use crate::transport::RegisterWord;

/// `coil <i>: <0|1>`
pub fn write_coils<W: Write>(out: &mut W, coils: &[(u16, bool)]) -> io::Result<()> {
    for (index, value) in coils {
        writeln!(out, "coil {}: {}", index, *value as u8)?;
    }
    Ok(())
}

/// `pin <i> <field>: <hex>` for every setting of every pin
pub fn write_holding_registers<W: Write>(
    out: &mut W,
    dump: &[(u16, FieldValues<PinSettingField>)],
    decode: bool,
) -> io::Result<()> {
    for (pin, values) in dump {
        for (field, value) in values.iter() {
            write!(out, "pin {} {}: {:x}", pin, field, value)?;
            if decode {
                if let Some(meaning) = describe_setting(field, value) {
                    write!(out, " ({})", meaning)?;
                }
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// System input block as `input register <i>: <hex>`, then
/// `pin <i> <counter>: <hex>` for every pin
pub fn write_input_registers<W: Write>(out: &mut W, dump: &InputRegisterDump) -> io::Result<()> {
    for (address, value) in dump.system.iter().enumerate() {
        writeln!(out, "input register {}: {:x}", address, value)?;
    }
    for (pin, values) in &dump.pins {
        for (field, value) in values.iter() {
            writeln!(out, "pin {} {}: {:x}", pin, field, value)?;
        }
    }
    Ok(())
}

/// `system <field>: <hex>`
pub fn write_system_settings<W: Write>(
    out: &mut W,
    values: &FieldValues<SystemSettingField>,
    decode: bool,
) -> io::Result<()> {
    for (field, value) in values.iter() {
        write!(out, "system {}: {:x}", field, value)?;
        if decode && field == SystemSettingField::Magic {
            let meaning = if value == MAGIC { "ok" } else { "mismatch" };
            write!(out, " ({})", meaning)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// `uptime: <seconds> seconds`, whole seconds
pub fn write_uptime<W: Write>(out: &mut W, uptime_millis: u32) -> io::Result<()> {
    writeln!(out, "uptime: {} seconds", uptime_millis / 1000)
}

/// Human readable meaning of a setting value, when it has one
pub fn describe_setting(field: PinSettingField, value: RegisterWord) -> Option<String> {
    if field == PinSettingField::Mode {
        return Some(match PinMode::decode(value) {
            Some(mode) => mode.to_string(),
            None => "invalid".to_string(),
        });
    }
    if field.is_command() {
        return Some(match Command::from_code(value) {
            Some(command) => command.to_string(),
            None => "unknown".to_string(),
        });
    }
    None
}
