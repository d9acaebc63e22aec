// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the pin board controller
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use homectrl::config::{self, Config};
use homectrl::device::{
    Command, Device, DeviceError, PinSettingField, ProtocolVersion, RegisterField,
};
use homectrl::report;
use homectrl::transport::RegisterWord;

/// Controller for the Modbus home automation pin board
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Serial device of the RS-485 adapter (selects Modbus RTU)
    #[arg(long)]
    port: Option<String>,

    /// Serial line speed (default: from the protocol version)
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Modbus slave id of the board
    #[arg(long)]
    slave_id: Option<u8>,

    /// Modbus TCP endpoint as ip:port (selects Modbus TCP)
    #[arg(long, value_name = "ADDR")]
    tcp: Option<String>,

    /// Firmware generation of the board
    #[arg(long, value_enum)]
    protocol: Option<ProtocolVersion>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Enable debug logging, including every register exchange
    #[arg(short = 'v', long = "debug", visible_alias = "verbose")]
    debug: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet", conflicts_with = "debug")]
    quiet: bool,

    /// Print every coil
    #[arg(long)]
    dump_coils: bool,

    /// Print the settings of every pin
    #[arg(long)]
    dump_holding_registers: bool,

    /// Print the system input registers and the counters of every pin
    #[arg(long)]
    dump_input_registers: bool,

    /// Print the system settings (magic and slave id)
    #[arg(long)]
    dump_system_settings: bool,

    /// Print the uptime of the board
    #[arg(long)]
    uptime: bool,

    /// Show the meaning of modes and commands next to raw values
    #[arg(long)]
    decode: bool,

    /// Pin addressed by --pin-setting and --set-coil
    #[arg(long, allow_negative_numbers = true)]
    pin_index: Option<i64>,

    /// Set one setting of a pin; VALUE is decimal, 0x-prefixed hex or a command name
    #[arg(
        long,
        num_args = 2,
        value_names = ["FIELD", "VALUE"],
        requires = "pin_index",
        conflicts_with = "set_coil"
    )]
    pin_setting: Option<Vec<String>>,

    /// Set the coil of a pin (0/1, on/off, true/false)
    #[arg(long, value_name = "VALUE", value_parser = parse_coil_value, requires = "pin_index")]
    set_coil: Option<bool>,

    /// Store a new Modbus slave id on the board
    #[arg(long, value_name = "ID")]
    set_slave_id: Option<u16>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = &args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("homectrl.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port.clone(),
        args.baud_rate,
        args.slave_id,
        args.tcp.clone(),
        args.protocol,
        args.timeout_ms,
    );

    // Names and values are checked before the board is contacted
    let pin_setting = match &args.pin_setting {
        Some(pair) => Some(parse_pin_setting(pair)?),
        None => None,
    };

    let mut device = Device::open(&config)
        .with_context(|| format!("Failed to connect to the board ({:?})", config.transport.kind))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.dump_coils {
        report::write_coils(&mut out, &device.dump_coils()?)?;
    }

    if args.dump_holding_registers {
        let dump = device.dump_holding_registers()?;
        report::write_holding_registers(&mut out, &dump, args.decode)?;
    }

    if args.dump_input_registers {
        report::write_input_registers(&mut out, &device.dump_input_registers()?)?;
    }

    if args.dump_system_settings {
        report::write_system_settings(&mut out, &device.system_settings()?, args.decode)?;
    }

    if let Some((field, value)) = pin_setting {
        let pin = pin_index(&device, args.pin_index)?;
        info!("Setting pin {} {} to {:#x}", pin, field, value);
        device.pin_settings(pin)?.set(field, value)?;
    }

    if let Some(value) = args.set_coil {
        let pin = pin_index(&device, args.pin_index)?;
        info!("Setting coil {} to {}", pin, value);
        device.set_coil(pin, value)?;
    }

    if let Some(slave_id) = args.set_slave_id {
        info!("Setting slave id to {}", slave_id);
        device.set_slave_id(slave_id)?;
    }

    if args.uptime {
        report::write_uptime(&mut out, device.uptime_millis()?)?;
    }

    out.flush()?;
    Ok(())
}

/// Resolve `--pin-setting FIELD VALUE`.
fn parse_pin_setting(pair: &[String]) -> Result<(PinSettingField, RegisterWord)> {
    let [name, raw] = pair else {
        anyhow::bail!("--pin-setting expects a field name and a value");
    };
    let field = PinSettingField::lookup(name)?;
    let value = parse_setting_value(field, raw)?;
    debug!("Parsed pin setting {} = {:#x}", field, value);
    Ok((field, value))
}

/// Decimal, `0x` hex, or a command name for command fields.
fn parse_setting_value(field: PinSettingField, raw: &str) -> Result<RegisterWord> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => RegisterWord::from_str_radix(hex, 16).ok(),
        None => raw.parse::<RegisterWord>().ok(),
    };
    if let Some(value) = parsed {
        return Ok(value);
    }
    if field.is_command() {
        if let Ok(command) = raw.parse::<Command>() {
            return Ok(command.code());
        }
    }
    anyhow::bail!("Invalid value '{}' for {}", raw, field)
}

fn parse_coil_value(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        _ => Err(format!("expected 0/1, on/off or true/false, got '{}'", raw)),
    }
}

/// `--pin-index` as a device pin, rejecting values no pin can have.
fn pin_index<T>(device: &Device<T>, raw: Option<i64>) -> Result<u16>
where
    T: homectrl::transport::RegisterTransport,
{
    let raw = raw.context("--pin-index is required")?;
    let number_of_pins = device.number_of_pins()?;
    u16::try_from(raw).map_err(|_| {
        anyhow::Error::from(DeviceError::InvalidPinIndex {
            index: raw,
            number_of_pins,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setting_value() {
        let field = PinSettingField::ClickCommand;
        assert_eq!(parse_setting_value(field, "3").unwrap(), 3);
        assert_eq!(parse_setting_value(field, "0x0a").unwrap(), 10);
        assert_eq!(parse_setting_value(field, "toggle").unwrap(), 3);
        assert!(parse_setting_value(PinSettingField::Group, "toggle").is_err());
        assert!(parse_setting_value(field, "-1").is_err());
    }

    #[test]
    fn test_parse_pin_setting() {
        let pair = vec!["pwm_on_value".to_string(), "0xff".to_string()];
        assert_eq!(
            parse_pin_setting(&pair).unwrap(),
            (PinSettingField::PwmOnValue, 0xff)
        );
        let pair = vec!["Mode".to_string(), "1".to_string()];
        assert!(parse_pin_setting(&pair).is_err());
    }

    #[test]
    fn test_parse_coil_value() {
        assert_eq!(parse_coil_value("on"), Ok(true));
        assert_eq!(parse_coil_value("0"), Ok(false));
        assert!(parse_coil_value("2").is_err());
    }

    #[test]
    fn test_args_require_pin_index() {
        assert!(Args::try_parse_from(["homectrl", "--set-coil", "1"]).is_err());
        assert!(Args::try_parse_from([
            "homectrl",
            "--pin-index",
            "1",
            "--set-coil",
            "1",
            "--pin-setting",
            "mode",
            "1"
        ])
        .is_err());
        let args = Args::try_parse_from([
            "homectrl",
            "--pin-index",
            "-1",
            "--pin-setting",
            "mode",
            "1",
        ])
        .unwrap();
        assert_eq!(args.pin_index, Some(-1));
        assert_eq!(
            args.pin_setting,
            Some(vec!["mode".to_string(), "1".to_string()])
        );
    }
}
