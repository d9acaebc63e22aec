// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Meaning of raw setting values
//!
//! The accessors hand out raw words. These helpers are only used to render
//! them for humans and to parse symbolic command names on the command line.

use std::fmt;
use std::str::FromStr;

use super::error::DeviceError;
use crate::transport::RegisterWord;

const MODE_MASK: RegisterWord = 0x03;
const BUTTON_MASK: RegisterWord = 0x04;
const INVERSE_MASK: RegisterWord = 0x08;
const PWM_MASK: RegisterWord = 0x10;

/// Direction of a pin, the two low bits of the `mode` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
    InputPullup,
}

/// Decoded `mode` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMode {
    pub direction: PinDirection,
    pub button: bool,
    pub inverse: bool,
    pub pwm: bool,
}

impl PinMode {
    /// Decode a raw `mode` word. Returns `None` when the direction bits hold
    /// the unused value 3.
    pub fn decode(raw: RegisterWord) -> Option<Self> {
        let direction = match raw & MODE_MASK {
            0 => PinDirection::Input,
            1 => PinDirection::Output,
            2 => PinDirection::InputPullup,
            _ => return None,
        };
        Some(Self {
            direction,
            button: raw & BUTTON_MASK != 0,
            inverse: raw & INVERSE_MASK != 0,
            pwm: raw & PWM_MASK != 0,
        })
    }

    pub fn encode(&self) -> RegisterWord {
        let mut raw = match self.direction {
            PinDirection::Input => 0,
            PinDirection::Output => 1,
            PinDirection::InputPullup => 2,
        };
        if self.button {
            raw |= BUTTON_MASK;
        }
        if self.inverse {
            raw |= INVERSE_MASK;
        }
        if self.pwm {
            raw |= PWM_MASK;
        }
        raw
    }

    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            PinDirection::Input => "input",
            PinDirection::Output => "output",
            PinDirection::InputPullup => "input_pullup",
        };
        f.write_str(direction)?;
        if self.button {
            f.write_str("+button")?;
        }
        if self.inverse {
            f.write_str("+inverse")?;
        }
        if self.pwm {
            f.write_str("+pwm")?;
        }
        Ok(())
    }
}

/// Action triggered on the pins of a group by a button or signal event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    Off,
    On,
    Toggle,
    PwmIncrease,
    PwmDecrease,
    FadeToOn,
    FadeToOff,
    FadeToggle,
    TriggerPwmUpDownStart,
    TriggerPwmUpDownStop,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::None,
        Command::Off,
        Command::On,
        Command::Toggle,
        Command::PwmIncrease,
        Command::PwmDecrease,
        Command::FadeToOn,
        Command::FadeToOff,
        Command::FadeToggle,
        Command::TriggerPwmUpDownStart,
        Command::TriggerPwmUpDownStop,
    ];

    /// Highest command code the firmware accepts in a command setting
    pub const MAX_ACCEPTED: Command = Command::PwmDecrease;

    pub fn code(self) -> RegisterWord {
        self as RegisterWord
    }

    pub fn from_code(code: RegisterWord) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::None => "none",
            Command::Off => "off",
            Command::On => "on",
            Command::Toggle => "toggle",
            Command::PwmIncrease => "pwm_increase",
            Command::PwmDecrease => "pwm_decrease",
            Command::FadeToOn => "fade_to_on",
            Command::FadeToOff => "fade_to_off",
            Command::FadeToggle => "fade_toggle",
            Command::TriggerPwmUpDownStart => "trigger_pwm_up_down_start",
            Command::TriggerPwmUpDownStop => "trigger_pwm_up_down_stop",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.name() == s)
            .ok_or_else(|| DeviceError::UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mode() {
        let mode = PinMode::decode(0x15).unwrap();
        assert_eq!(mode.direction, PinDirection::Output);
        assert!(mode.button);
        assert!(!mode.inverse);
        assert!(mode.pwm);
        assert_eq!(mode.to_string(), "output+button+pwm");
        assert_eq!(mode.encode(), 0x15);

        assert_eq!(PinMode::decode(0x02).unwrap().to_string(), "input_pullup");
        assert!(PinMode::decode(0x03).is_none());
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::None.code(), 0);
        assert_eq!(Command::Toggle.code(), 3);
        assert_eq!(Command::TriggerPwmUpDownStop.code(), 0x0a);
        assert_eq!(Command::from_code(2), Some(Command::On));
        assert_eq!(Command::from_code(11), None);
        assert_eq!("fade_toggle".parse::<Command>().unwrap(), Command::FadeToggle);
        assert!(matches!(
            "Toggle".parse::<Command>(),
            Err(DeviceError::UnknownCommand(name)) if name == "Toggle"
        ));
    }
}
