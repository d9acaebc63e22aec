// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register layout of the pin board
//!
//! The firmware packs every setting and counter into fixed-size slots. This
//! module only does address arithmetic; it never touches a transport.
//!
//! ## Holding registers
//!
//! | Address | Content |
//! |---------|---------|
//! | 0 .. system_setting_size | system settings (magic, slave id, reserved) |
//! | system_setting_size + i × pin_setting_size | settings block of pin `i` |
//!
//! ## Input registers
//!
//! | Address | Content |
//! |---------|---------|
//! | 0 | number of pins |
//! | 1 - 2 | uptime in milliseconds (low word first) |
//! | 3 .. system_setting_size | reserved |
//! | pin_counter_offset + i × pin_counter_size | counter block of pin `i` |
//!
//! Field order inside a block is the declaration order of the field tables
//! below and must match the firmware exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{DeviceError, DeviceResult};
use crate::transport::RegisterWord;

/// Input register holding the number of pins
pub const NUMBER_OF_PINS_ADDRESS: u16 = 0;

/// First of the two input registers holding the uptime counter
pub const UPTIME_ADDRESS: u16 = 1;

/// Value of the magic system setting on a formatted board
pub const MAGIC: RegisterWord = 0x43;

/// A named word inside a register block.
///
/// The offset of a field is its position in [`RegisterField::ALL`].
pub trait RegisterField: Copy + Eq + fmt::Debug + 'static {
    /// Every field of the block, in wire order
    const ALL: &'static [Self];

    /// Exact name used on the command line and in dumps
    fn name(self) -> &'static str;

    /// Word offset inside the block
    fn offset(self) -> u16;

    /// Case-sensitive lookup by name
    fn lookup(name: &str) -> DeviceResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name() == name)
            .ok_or_else(|| DeviceError::UnknownField(name.to_string()))
    }
}

macro_rules! register_fields {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl RegisterField for $name {
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            fn offset(self) -> u16 {
                self as u16
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = DeviceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as RegisterField>::lookup(s)
            }
        }
    };
}

register_fields! {
    /// Words of a pin settings block (holding registers)
    pub enum PinSettingField {
        Mode => "mode",
        Group => "group",
        OutputValue => "output_value",
        ClickCommand => "click_command",
        SingleClickCommand => "single_click_command",
        LongClickCommand => "long_click_command",
        DoubleClickCommand => "double_click_command",
        SignalRiseCommand => "signal_rise_command",
        SignalFallCommand => "signal_fall_command",
        ReleaseCommand => "release_command",
        PwmOnValue => "pwm_on_value",
    }
}

register_fields! {
    /// Words of a pin counters block (input registers)
    pub enum PinCounterField {
        PinNumber => "pin_number",
        ClickCnt => "click_cnt",
        SingleClickCnt => "single_click_cnt",
        DoubleClickCnt => "double_click_cnt",
        LongPressCnt => "long_press_cnt",
        ReleaseCnt => "release_cnt",
    }
}

register_fields! {
    /// Words of the system settings block (holding registers)
    pub enum SystemSettingField {
        Magic => "magic",
        SlaveId => "slave_id",
    }
}

impl PinSettingField {
    /// Fields whose value is a [`super::semantics::Command`] code
    pub fn is_command(self) -> bool {
        matches!(
            self,
            PinSettingField::ClickCommand
                | PinSettingField::SingleClickCommand
                | PinSettingField::LongClickCommand
                | PinSettingField::DoubleClickCommand
                | PinSettingField::SignalRiseCommand
                | PinSettingField::SignalFallCommand
                | PinSettingField::ReleaseCommand
        )
    }
}

/// Firmware generation of the board.
///
/// Both generations share the address scheme and differ only in their
/// layout constants and line speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// One settings word per declared field, 9600 baud
    V1,
    /// 16-word settings blocks, 19200 baud
    #[default]
    V2,
}

impl ProtocolVersion {
    pub fn layout(self) -> DeviceLayout {
        match self {
            ProtocolVersion::V1 => DeviceLayout::new(8, PinSettingField::ALL.len() as u16, 8, 8),
            ProtocolVersion::V2 => DeviceLayout::new(8, 16, 8, 8),
        }
    }

    pub fn default_baud_rate(self) -> u32 {
        match self {
            ProtocolVersion::V1 => 9600,
            ProtocolVersion::V2 => 19200,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => f.write_str("v1"),
            ProtocolVersion::V2 => f.write_str("v2"),
        }
    }
}

/// Layout constants of the register address space, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLayout {
    /// Words reserved for device-wide settings (and system input registers)
    pub system_setting_size: u16,
    /// Words per pin settings block
    pub pin_setting_size: u16,
    /// Input register address of the first pin counters block
    pub pin_counter_offset: u16,
    /// Words per pin counters block
    pub pin_counter_size: u16,
}

impl Default for DeviceLayout {
    fn default() -> Self {
        ProtocolVersion::default().layout()
    }
}

impl DeviceLayout {
    pub const fn new(
        system_setting_size: u16,
        pin_setting_size: u16,
        pin_counter_offset: u16,
        pin_counter_size: u16,
    ) -> Self {
        Self {
            system_setting_size,
            pin_setting_size,
            pin_counter_offset,
            pin_counter_size,
        }
    }

    /// Check that every block can hold its field table and that blocks do
    /// not overlap.
    pub fn validate(&self) -> DeviceResult<()> {
        if (self.system_setting_size as usize) < SystemSettingField::ALL.len() {
            return Err(DeviceError::InvalidLayout(format!(
                "system_setting_size {} cannot hold {} system fields",
                self.system_setting_size,
                SystemSettingField::ALL.len()
            )));
        }
        // The uptime words live in the system input block.
        if self.system_setting_size < UPTIME_ADDRESS + 2 {
            return Err(DeviceError::InvalidLayout(format!(
                "system_setting_size {} does not cover the uptime registers",
                self.system_setting_size
            )));
        }
        if (self.pin_setting_size as usize) < PinSettingField::ALL.len() {
            return Err(DeviceError::InvalidLayout(format!(
                "pin_setting_size {} cannot hold {} setting fields",
                self.pin_setting_size,
                PinSettingField::ALL.len()
            )));
        }
        if (self.pin_counter_size as usize) < PinCounterField::ALL.len() {
            return Err(DeviceError::InvalidLayout(format!(
                "pin_counter_size {} cannot hold {} counter fields",
                self.pin_counter_size,
                PinCounterField::ALL.len()
            )));
        }
        if self.pin_counter_offset < self.system_setting_size {
            return Err(DeviceError::InvalidLayout(format!(
                "pin_counter_offset {} overlaps the system block of {} words",
                self.pin_counter_offset, self.system_setting_size
            )));
        }
        Ok(())
    }

    /// Holding register address of the settings block of `pin`.
    pub fn settings_address(&self, pin: u16, number_of_pins: u16) -> DeviceResult<u16> {
        check_pin_index(pin, number_of_pins)?;
        block_address(
            self.system_setting_size,
            pin,
            self.pin_setting_size,
            number_of_pins,
        )
    }

    /// Input register address of the counters block of `pin`.
    pub fn counters_address(&self, pin: u16, number_of_pins: u16) -> DeviceResult<u16> {
        check_pin_index(pin, number_of_pins)?;
        block_address(
            self.pin_counter_offset,
            pin,
            self.pin_counter_size,
            number_of_pins,
        )
    }

    /// Offset of a named pin setting inside its block.
    pub fn field_offset(&self, name: &str) -> DeviceResult<u16> {
        Ok(PinSettingField::lookup(name)?.offset())
    }

    /// Offset of a named pin counter inside its block.
    pub fn counter_offset(&self, name: &str) -> DeviceResult<u16> {
        Ok(PinCounterField::lookup(name)?.offset())
    }

    /// Number of holding registers spanned by a board with `number_of_pins` pins
    pub fn holding_register_count(&self, number_of_pins: u16) -> u32 {
        self.system_setting_size as u32 + number_of_pins as u32 * self.pin_setting_size as u32
    }

    /// Number of input registers spanned by a board with `number_of_pins` pins
    pub fn input_register_count(&self, number_of_pins: u16) -> u32 {
        self.pin_counter_offset as u32 + number_of_pins as u32 * self.pin_counter_size as u32
    }
}

/// Reject pin indices outside `[0, number_of_pins)`.
pub fn check_pin_index(pin: u16, number_of_pins: u16) -> DeviceResult<()> {
    if pin >= number_of_pins {
        return Err(DeviceError::InvalidPinIndex {
            index: pin as i64,
            number_of_pins,
        });
    }
    Ok(())
}

fn block_address(base: u16, pin: u16, block_size: u16, number_of_pins: u16) -> DeviceResult<u16> {
    let address = base as u32 + pin as u32 * block_size as u32;
    u16::try_from(address).map_err(|_| DeviceError::InvalidPinIndex {
        index: pin as i64,
        number_of_pins,
    })
}

/// Field values of one block, in wire order.
///
/// Values are raw register words; nothing is decoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValues<F: RegisterField> {
    values: Vec<(F, RegisterWord)>,
}

impl<F: RegisterField> FieldValues<F> {
    /// Slice a raw block according to the field table of `F`.
    ///
    /// Fails with `ProtocolViolation` when `words` is shorter than
    /// `block_size` or than the field table.
    pub fn from_block(words: &[RegisterWord], block_size: u16) -> DeviceResult<Self> {
        let expected = (block_size as usize).max(F::ALL.len());
        if words.len() < expected {
            return Err(DeviceError::ProtocolViolation {
                expected,
                actual: words.len(),
            });
        }
        let values = F::ALL
            .iter()
            .map(|field| (*field, words[field.offset() as usize]))
            .collect();
        Ok(Self { values })
    }

    pub fn get(&self, field: F) -> Option<RegisterWord> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, RegisterWord)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_address_steps_by_block_size() {
        let layout = ProtocolVersion::V2.layout();
        let pins = 12;
        assert_eq!(layout.settings_address(0, pins).unwrap(), 8);
        for pin in 0..pins - 1 {
            let current = layout.settings_address(pin, pins).unwrap();
            let next = layout.settings_address(pin + 1, pins).unwrap();
            assert!(next > current);
            assert_eq!(next - current, layout.pin_setting_size);
        }
        assert_eq!(layout.settings_address(2, pins).unwrap(), 8 + 2 * 16);
    }

    #[test]
    fn test_counters_address() {
        let layout = ProtocolVersion::V2.layout();
        assert_eq!(layout.counters_address(0, 12).unwrap(), 8);
        assert_eq!(layout.counters_address(2, 12).unwrap(), 8 + 2 * 8);
    }

    #[test]
    fn test_out_of_range_pin_is_rejected() {
        let layout = DeviceLayout::default();
        match layout.settings_address(3, 3) {
            Err(DeviceError::InvalidPinIndex {
                index,
                number_of_pins,
            }) => {
                assert_eq!(index, 3);
                assert_eq!(number_of_pins, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            layout.counters_address(0, 0),
            Err(DeviceError::InvalidPinIndex { .. })
        ));
    }

    #[test]
    fn test_field_offsets_follow_declaration_order() {
        let layout = DeviceLayout::default();
        for (index, field) in PinSettingField::ALL.iter().enumerate() {
            assert_eq!(layout.field_offset(field.name()).unwrap(), index as u16);
        }
        assert_eq!(layout.field_offset("pwm_on_value").unwrap(), 10);
        assert_eq!(layout.counter_offset("release_cnt").unwrap(), 5);
        assert_eq!(SystemSettingField::SlaveId.offset(), 1);
    }

    #[test]
    fn test_field_lookup_is_exact() {
        let layout = DeviceLayout::default();
        assert_eq!(layout.field_offset("mode").unwrap(), 0);
        assert!(matches!(
            layout.field_offset("Mode"),
            Err(DeviceError::UnknownField(name)) if name == "Mode"
        ));
        assert!(layout.field_offset(" mode").is_err());
        assert!("click_cnt".parse::<PinSettingField>().is_err());
        assert_eq!(
            "long_press_cnt".parse::<PinCounterField>().unwrap(),
            PinCounterField::LongPressCnt
        );
    }

    #[test]
    fn test_protocol_versions() {
        let v1 = ProtocolVersion::V1.layout();
        assert_eq!(v1.pin_setting_size, 11);
        assert_eq!(ProtocolVersion::V1.default_baud_rate(), 9600);
        assert_eq!(ProtocolVersion::V2.default_baud_rate(), 19200);
        assert!(v1.validate().is_ok());
        assert!(ProtocolVersion::V2.layout().validate().is_ok());
    }

    #[test]
    fn test_layout_validation() {
        assert!(DeviceLayout::new(8, 10, 8, 8).validate().is_err());
        assert!(DeviceLayout::new(8, 16, 8, 5).validate().is_err());
        assert!(DeviceLayout::new(8, 16, 4, 8).validate().is_err());
        assert!(DeviceLayout::new(2, 16, 8, 8).validate().is_err());
        assert!(DeviceLayout::new(4, 16, 4, 6).validate().is_ok());
    }

    #[test]
    fn test_register_counts() {
        let layout = ProtocolVersion::V2.layout();
        assert_eq!(layout.holding_register_count(12), 8 + 12 * 16);
        assert_eq!(layout.input_register_count(12), 8 + 12 * 8);
    }

    #[test]
    fn test_field_values_from_block() {
        let words: Vec<u16> = (0..16).map(|i| 100 + i).collect();
        let values = FieldValues::<PinSettingField>::from_block(&words, 16).unwrap();
        assert_eq!(values.len(), PinSettingField::ALL.len());
        assert_eq!(values.get(PinSettingField::Mode), Some(100));
        assert_eq!(values.get(PinSettingField::PwmOnValue), Some(110));
        let names: Vec<&str> = values.iter().map(|(f, _)| f.name()).collect();
        assert_eq!(names[0], "mode");
        assert_eq!(names[10], "pwm_on_value");
    }

    #[test]
    fn test_field_values_short_block() {
        let words = vec![0u16; 7];
        match FieldValues::<PinCounterField>::from_block(&words, 8) {
            Err(DeviceError::ProtocolViolation { expected, actual }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 7);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
