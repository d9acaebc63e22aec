// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Read-only access to the button counters of one pin

use super::error::DeviceResult;
use super::layout::{check_pin_index, DeviceLayout, FieldValues, PinCounterField};
use crate::transport::{FunctionCode, RegisterTransport};

/// Counters of a single pin. The board owns them; there is no write path.
pub struct PinCounters<'a, T: RegisterTransport + ?Sized> {
    transport: &'a mut T,
    layout: &'a DeviceLayout,
    pin: u16,
    number_of_pins: u16,
}

impl<'a, T: RegisterTransport + ?Sized> PinCounters<'a, T> {
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

    /// Read the whole counters block in one request.
    pub fn read_all(&mut self) -> DeviceResult<FieldValues<PinCounterField>> {
        let address = self.layout.counters_address(self.pin, self.number_of_pins)?;
        let words = self.transport.read_registers(
            FunctionCode::ReadInputRegisters,
            address,
            self.layout.pin_counter_size,
        )?;
        FieldValues::from_block(&words, self.layout.pin_counter_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::error::DeviceError;
    use crate::device::layout::ProtocolVersion;
    use crate::transport::MockRegisterTransport;
    use mockall::predicate::eq;

    #[test]
    fn test_read_all_uses_input_registers() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read_registers()
            .with(eq(FunctionCode::ReadInputRegisters), eq(8 + 2 * 8), eq(8))
            .times(1)
            .returning(|_, _, _| Ok(vec![4, 5, 0, 0, 0, 5, 0, 0]));

        let mut counters = PinCounters::new(&mut transport, &layout, 2, 12).unwrap();
        let values = counters.read_all().unwrap();
        assert_eq!(values.len(), 6);
        assert_eq!(values.get(PinCounterField::PinNumber), Some(4));
        assert_eq!(values.get(PinCounterField::ClickCnt), Some(5));
        assert_eq!(values.get(PinCounterField::ReleaseCnt), Some(5));
    }

    #[test]
    fn test_out_of_range_pin_never_reads() {
        let layout = ProtocolVersion::V2.layout();
        let mut transport = MockRegisterTransport::new();
        transport.expect_read_registers().never();
        assert!(matches!(
            PinCounters::new(&mut transport, &layout, 12, 12),
            Err(DeviceError::InvalidPinIndex { .. })
        ));
    }
}
