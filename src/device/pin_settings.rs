// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Access to the settings block of one pin

use log::debug;

use super::error::{DeviceError, DeviceResult};
use super::layout::{check_pin_index, DeviceLayout, FieldValues, PinSettingField, RegisterField};
use crate::transport::{FunctionCode, RegisterTransport, RegisterWord};

/// Settings of a single pin, bound to the device transport.
///
/// Instances are handed out by [`super::Device::pin_settings`], which has
/// already checked the pin index.
pub struct PinSettings<'a, T: RegisterTransport + ?Sized> {
    transport: &'a mut T,
    layout: &'a DeviceLayout,
    pin: u16,
    number_of_pins: u16,
}

impl<'a, T: RegisterTransport + ?Sized> PinSettings<'a, T> {
    pub(crate) fn new(
        transport: &'a mut T,
        layout: &'a DeviceLayout,
        pin: u16,
        number_of_pins: u16,
    ) -> DeviceResult<Self> {
        check_pin_index(pin, number_of_pins)?;
        Ok(Self {
            transport,
            layout,
            pin,
            number_of_pins,
        })
    }

    pub fn pin(&self) -> u16 {
        self.pin
    }

    /// Write one named setting.
    ///
    /// The name is resolved before anything is sent, so an unknown field
    /// never produces a write.
    pub fn set_field(&mut self, name: &str, value: RegisterWord) -> DeviceResult<()> {
        let field = PinSettingField::lookup(name)?;
        self.set(field, value)
    }

    /// Write one setting.
    pub fn set(&mut self, field: PinSettingField, value: RegisterWord) -> DeviceResult<()> {
        let base = self.layout.settings_address(self.pin, self.number_of_pins)?;
        let address = base
            .checked_add(field.offset())
            .ok_or_else(|| DeviceError::InvalidLayout(format!("{} overflows the address space", field)))?;
        debug!(
            "Setting pin {} {} to {:#x} (register {})",
            self.pin, field, value, address
        );
        self.transport.write_register(address, value)?;
        Ok(())
    }

    /// Read the whole settings block in one request.
    pub fn read_all(&mut self) -> DeviceResult<FieldValues<PinSettingField>> {
        let address = self.layout.settings_address(self.pin, self.number_of_pins)?;
        let words = self.transport.read_registers(
            FunctionCode::ReadHoldingRegisters,
            address,
            self.layout.pin_setting_size,
        )?;
        FieldValues::from_block(&words, self.layout.pin_setting_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::layout::ProtocolVersion;
    use crate::transport::{MockRegisterTransport, TransportError};
    use mockall::predicate::eq;

    #[test]
    fn test_set_field_writes_at_block_offset() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_write_register()
            .with(eq(8 + 2 * 16 + 1), eq(23))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut settings = PinSettings::new(&mut transport, &layout, 2, 12).unwrap();
        settings.set_field("group", 23).unwrap();
    }

    #[test]
    fn test_unknown_field_never_writes() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport.expect_write_register().never();

        let mut settings = PinSettings::new(&mut transport, &layout, 0, 4).unwrap();
        let result = settings.set_field("Mode", 1);
        assert!(matches!(result, Err(DeviceError::UnknownField(_))));
    }

    #[test]
    fn test_out_of_range_pin_is_rejected() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        let result = PinSettings::new(&mut transport, &layout, 4, 4);
        assert!(matches!(
            result,
            Err(DeviceError::InvalidPinIndex {
                index: 4,
                number_of_pins: 4
            })
        ));
    }

    #[test]
    fn test_read_all_slices_block() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read_registers()
            .with(eq(FunctionCode::ReadHoldingRegisters), eq(8 + 16), eq(16))
            .times(1)
            .returning(|_, _, count| Ok((0..count).collect()));

        let mut settings = PinSettings::new(&mut transport, &layout, 1, 2).unwrap();
        let values = settings.read_all().unwrap();
        assert_eq!(values.len(), 11);
        assert_eq!(values.get(PinSettingField::Mode), Some(0));
        assert_eq!(values.get(PinSettingField::ReleaseCommand), Some(9));
    }

    #[test]
    fn test_short_read_is_protocol_violation() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read_registers()
            .returning(|_, _, _| Ok(vec![0; 11]));

        let mut settings = PinSettings::new(&mut transport, &layout, 0, 1).unwrap();
        assert!(matches!(
            settings.read_all(),
            Err(DeviceError::ProtocolViolation {
                expected: 16,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_transport_failure_is_propagated() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport.expect_write_register().times(1).returning(|_, _| {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no answer",
            )))
        });

        let mut settings = PinSettings::new(&mut transport, &layout, 0, 1).unwrap();
        assert!(matches!(
            settings.set(PinSettingField::OutputValue, 1),
            Err(DeviceError::Transport(TransportError::Io(_)))
        ));
    }
}
